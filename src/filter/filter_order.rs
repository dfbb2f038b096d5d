use serde_json::Value;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"order:asc"`, `"order:asc,title:desc"`, `"title desc"`,
    /// an array of those, or `{ "order": "asc" }`.
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        other => return Err(FilterError::InvalidSort(other.to_string())),
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (k, v) in obj {
                    // `sort[0]=order:asc` decodes to an index-keyed object
                    if k.chars().all(|c| c.is_ascii_digit()) {
                        if let Value::String(s) = v {
                            out.extend(Self::parse_order_string(s)?);
                            continue;
                        }
                    }
                    FilterWhere::validate_field(k)?;
                    out.push(FilterOrderInfo {
                        field: k.clone(),
                        sort: Self::direction(v.as_str().unwrap_or("asc"))?,
                    });
                }
                Ok(out)
            }
            other => Err(FilterError::InvalidSort(other.to_string())),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (field, dir) = match trimmed.split_once(':') {
                Some((f, d)) => (f.trim(), d.trim()),
                None => {
                    let mut it = trimmed.split_whitespace();
                    let f = it.next().unwrap_or_default();
                    (f, it.next().unwrap_or("asc"))
                }
            };
            FilterWhere::validate_field(field)?;
            out.push(FilterOrderInfo {
                field: field.to_string(),
                sort: Self::direction(dir)?,
            });
        }
        Ok(out)
    }

    fn direction(dir: &str) -> Result<SortDirection, FilterError> {
        if dir.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if dir.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(FilterError::InvalidSort(format!("unknown direction '{}'", dir)))
        }
    }
}
