use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterCondition, FilterExpr, FilterOrderInfo, Status};

/// A fully validated collection query: filters, variant, ordering and window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filters: FilterExpr,
    pub status: Status,
    pub sort: Vec<FilterOrderInfo>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindQuery {
    pub fn new(status: Status) -> Self {
        Self { status, ..Default::default() }
    }

    pub fn filter(mut self, expr: FilterExpr) -> Self {
        let current = std::mem::take(&mut self.filters);
        self.filters = current.and(expr);
        self
    }

    pub fn where_eq(self, path: &[&str], value: impl Into<Value>) -> Self {
        self.filter(FilterExpr::Condition(FilterCondition::eq(path, value)))
    }

    pub fn sort_by(mut self, order: FilterOrderInfo) -> Self {
        self.sort.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builds a query from a decoded request query object
    /// (`filters`, `sort`, `status`, `pagination[...]`).
    pub fn from_request_query(
        query: &Value,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<Self, FilterError> {
        let filters = FilterWhere::parse(query.get("filters").unwrap_or(&Value::Null))?;
        let sort = FilterOrder::validate_and_parse(query.get("sort").unwrap_or(&Value::Null))?;

        let status = match query.get("status").and_then(Value::as_str) {
            None => Status::default(),
            Some(s) => Status::parse(s).ok_or_else(|| FilterError::InvalidStatus(s.to_string()))?,
        };

        let pagination = query.get("pagination");
        let field = |name: &str| pagination.and_then(|p| p.get(name));

        let (limit, offset) = if let Some(page_size) = field("pageSize") {
            let size = parse_count(page_size, "pageSize").map_err(FilterError::InvalidLimit)?;
            let page = match field("page") {
                Some(p) => parse_count(p, "page").map_err(FilterError::InvalidOffset)?.max(1),
                None => 1,
            };
            (size, (page - 1) * size)
        } else {
            let limit = match field("limit") {
                Some(l) => parse_count(l, "limit").map_err(FilterError::InvalidLimit)?,
                None => default_limit,
            };
            let start = match field("start") {
                Some(s) => parse_count(s, "start").map_err(FilterError::InvalidOffset)?,
                None => 0,
            };
            (limit, start)
        };

        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        Ok(Self {
            filters,
            status,
            sort,
            limit: Some(applied_limit),
            offset,
        })
    }
}

fn parse_count(value: &Value, name: &str) -> Result<usize, String> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| format!("{} must be a non-negative integer", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_published_with_default_limit() {
        let q = FindQuery::from_request_query(&json!({}), 25, 100).unwrap();
        assert_eq!(q.status, Status::Published);
        assert_eq!(q.limit, Some(25));
        assert_eq!(q.offset, 0);
        assert!(q.filters.is_empty());
    }

    #[test]
    fn page_based_pagination_computes_offset() {
        let q = FindQuery::from_request_query(
            &json!({ "pagination": { "page": "3", "pageSize": "10" }, "status": "draft" }),
            25,
            100,
        )
        .unwrap();
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, 20);
        assert_eq!(q.status, Status::Draft);
    }

    #[test]
    fn caps_limit_and_rejects_bad_status() {
        let q = FindQuery::from_request_query(&json!({ "pagination": { "limit": "5000" } }), 25, 100)
            .unwrap();
        assert_eq!(q.limit, Some(100));
        assert!(FindQuery::from_request_query(&json!({ "status": "archived" }), 25, 100).is_err());
    }

    #[test]
    fn where_eq_conjoins() {
        let q = FindQuery::new(Status::Draft)
            .where_eq(&["slug"], "home")
            .where_eq(&["application"], 3);
        match q.filters {
            FilterExpr::And(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected And, got {:?}", other),
        }
    }
}
