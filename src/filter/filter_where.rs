use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterCondition, FilterExpr, FilterOp};

/// Parses a nested `filters` object into a [`FilterExpr`] tree.
///
/// Keys that are not operators extend the field path, so
/// `{ "page": { "application": { "id": { "$eq": 42 } } } }` becomes the single
/// condition `page.application.id $eq 42`. A bare value is an implicit `$eq`.
pub struct FilterWhere;

impl FilterWhere {
    pub fn parse(where_data: &Value) -> Result<FilterExpr, FilterError> {
        match where_data {
            Value::Null => Ok(FilterExpr::all()),
            Value::Object(obj) => Self::parse_object(obj, &[]),
            _ => Err(FilterError::InvalidWhereClause("filters must be an object".to_string())),
        }
    }

    fn parse_object(obj: &Map<String, Value>, path: &[String]) -> Result<FilterExpr, FilterError> {
        let mut parts = Vec::new();

        for (key, value) in obj {
            match key.as_str() {
                "$and" | "$or" => {
                    let items = Self::array_items(key, value)?;
                    let mut sub = Vec::with_capacity(items.len());
                    for item in items {
                        let item_obj = item.as_object().ok_or_else(|| {
                            FilterError::InvalidOperatorData(format!("{} entries must be objects", key))
                        })?;
                        sub.push(Self::parse_object(item_obj, path)?);
                    }
                    parts.push(if key == "$and" { FilterExpr::And(sub) } else { FilterExpr::Or(sub) });
                }
                "$not" => {
                    let inner = value.as_object().ok_or_else(|| {
                        FilterError::InvalidOperatorData("$not requires an object".to_string())
                    })?;
                    parts.push(FilterExpr::Not(Box::new(Self::parse_object(inner, path)?)));
                }
                op_key if op_key.starts_with('$') => {
                    if path.is_empty() {
                        return Err(FilterError::InvalidWhereClause(format!(
                            "operator {} must follow a field name",
                            op_key
                        )));
                    }
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                    parts.push(FilterExpr::Condition(FilterCondition {
                        path: path.to_vec(),
                        operator,
                        data: Self::operand(operator, value)?,
                    }));
                }
                field => {
                    Self::validate_field(field)?;
                    let mut field_path = path.to_vec();
                    field_path.push(field.to_string());
                    match value {
                        Value::Object(inner) => parts.push(Self::parse_object(inner, &field_path)?),
                        Value::Array(_) => parts.push(FilterExpr::Condition(FilterCondition {
                            path: field_path,
                            operator: FilterOp::In,
                            data: value.clone(),
                        })),
                        _ => parts.push(FilterExpr::Condition(FilterCondition {
                            path: field_path,
                            operator: FilterOp::Eq,
                            data: value.clone(),
                        })),
                    }
                }
            }
        }

        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => FilterExpr::And(parts),
        })
    }

    fn array_items<'a>(op: &str, value: &'a Value) -> Result<Vec<&'a Value>, FilterError> {
        match value {
            Value::Array(items) => Ok(items.iter().collect()),
            // Query strings decode `$or[0][...]` into an index-keyed object
            Value::Object(obj) => Ok(obj.values().collect()),
            _ => Err(FilterError::InvalidOperatorData(format!("{} requires array", op))),
        }
    }

    fn operand(operator: FilterOp, value: &Value) -> Result<Value, FilterError> {
        match operator {
            FilterOp::In | FilterOp::NotIn => match value {
                Value::Array(_) => Ok(value.clone()),
                Value::Object(obj) => Ok(Value::Array(obj.values().cloned().collect())),
                other => Ok(Value::Array(vec![other.clone()])),
            },
            FilterOp::Null | FilterOp::NotNull => Ok(Value::Bool(truthy(value))),
            _ => match value {
                Value::Object(_) | Value::Array(_) => Err(FilterError::InvalidOperatorData(format!(
                    "{:?} requires a scalar operand",
                    operator
                ))),
                other => Ok(other.clone()),
            },
        }
    }

    pub fn validate_field(field: &str) -> Result<(), FilterError> {
        let mut chars = field.chars();
        let valid_start = chars.next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
        if !valid_start || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidField(field.to_string()));
        }
        Ok(())
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_on_top_level_field() {
        let expr = FilterWhere::parse(&json!({ "domain": "example.com" })).unwrap();
        assert_eq!(expr, FilterExpr::Condition(FilterCondition::eq(&["domain"], "example.com")));
    }

    #[test]
    fn nested_relation_path_collapses_into_one_condition() {
        let expr = FilterWhere::parse(&json!({
            "page": { "application": { "id": { "$eq": "42" } } }
        }))
        .unwrap();
        assert_eq!(
            expr,
            FilterExpr::Condition(FilterCondition::eq(&["page", "application", "id"], "42"))
        );
    }

    #[test]
    fn multiple_fields_are_conjoined() {
        let expr = FilterWhere::parse(&json!({ "slug": "home", "application": "7" })).unwrap();
        match expr {
            FilterExpr::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn or_accepts_index_keyed_objects() {
        let expr = FilterWhere::parse(&json!({
            "$or": { "0": { "slug": "a" }, "1": { "slug": "b" } }
        }))
        .unwrap();
        match expr {
            FilterExpr::Or(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn in_operand_is_normalized_to_array() {
        let expr = FilterWhere::parse(&json!({ "id": { "$in": { "0": "1", "1": "2" } } })).unwrap();
        match expr {
            FilterExpr::Condition(c) => {
                assert_eq!(c.operator, FilterOp::In);
                assert_eq!(c.data, json!(["1", "2"]));
            }
            other => panic!("expected condition, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_operator_and_bad_field() {
        assert!(matches!(
            FilterWhere::parse(&json!({ "slug": { "$regex": "x" } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "sl'ug": "x" })),
            Err(FilterError::InvalidField(_))
        ));
    }
}
