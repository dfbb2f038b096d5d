use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::types::{FilterCondition, FilterExpr, FilterOp, FilterOrderInfo, SortDirection};
use crate::models::Collection;

/// Loads related records while walking a relation path
pub trait RelationResolver {
    fn load(&self, collection: Collection, id: &Value) -> Option<Map<String, Value>>;
}

/// Evaluates filter expressions against flattened records held in memory
pub struct FilterMatcher<'a, R: RelationResolver> {
    resolver: &'a R,
}

impl<'a, R: RelationResolver> FilterMatcher<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    pub fn matches(&self, expr: &FilterExpr, collection: Collection, record: &Map<String, Value>) -> bool {
        match expr {
            FilterExpr::Condition(condition) => self.matches_condition(condition, collection, record),
            FilterExpr::And(parts) => parts.iter().all(|p| self.matches(p, collection, record)),
            FilterExpr::Or(parts) => parts.iter().any(|p| self.matches(p, collection, record)),
            FilterExpr::Not(inner) => !self.matches(inner, collection, record),
        }
    }

    fn matches_condition(
        &self,
        condition: &FilterCondition,
        collection: Collection,
        record: &Map<String, Value>,
    ) -> bool {
        let actual = self.resolve_path(collection, record, &condition.path);
        compare(condition.operator, actual.as_ref(), &condition.data)
    }

    /// Walks `path`, following relation fields into their target collection
    pub fn resolve_path(
        &self,
        collection: Collection,
        record: &Map<String, Value>,
        path: &[String],
    ) -> Option<Value> {
        let (head, tail) = path.split_first()?;
        let value = record.get(head)?;
        if tail.is_empty() {
            return Some(value.clone());
        }

        if let Some(target) = collection.relation_target(head) {
            if value.is_null() {
                return None;
            }
            if tail.len() == 1 && tail[0] == "id" {
                return Some(value.clone());
            }
            let related = self.resolver.load(target, value)?;
            return self.resolve_path(target, &related, tail);
        }

        let mut current = value;
        for key in tail {
            current = current.get(key)?;
        }
        Some(current.clone())
    }
}

/// Textual form used for loose comparisons: `42`, `"42"` and `42.0` are not all
/// equal, but a number and its decimal string are.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    value.map(Value::is_null).unwrap_or(true)
}

fn loose_eq(actual: Option<&Value>, data: &Value) -> bool {
    if data.is_null() {
        return is_missing(actual);
    }
    match (actual.and_then(scalar_text), scalar_text(data)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn ordering(actual: Option<&Value>, data: &Value) -> Option<Ordering> {
    let a = actual.and_then(scalar_text)?;
    let b = scalar_text(data)?;
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y),
        _ => Some(a.cmp(&b)),
    }
}

fn compare(operator: FilterOp, actual: Option<&Value>, data: &Value) -> bool {
    match operator {
        FilterOp::Eq => loose_eq(actual, data),
        FilterOp::Ne => !loose_eq(actual, data),
        FilterOp::Eqi => match (actual.and_then(scalar_text), scalar_text(data)) {
            (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => false,
        },
        FilterOp::Gt => matches!(ordering(actual, data), Some(Ordering::Greater)),
        FilterOp::Gte => matches!(ordering(actual, data), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => matches!(ordering(actual, data), Some(Ordering::Less)),
        FilterOp::Lte => matches!(ordering(actual, data), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::In => data
            .as_array()
            .map(|items| items.iter().any(|item| loose_eq(actual, item)))
            .unwrap_or(false),
        FilterOp::NotIn => data
            .as_array()
            .map(|items| !items.iter().any(|item| loose_eq(actual, item)))
            .unwrap_or(true),
        FilterOp::Contains => match (actual.and_then(scalar_text), scalar_text(data)) {
            (Some(a), Some(b)) => a.contains(&b),
            _ => false,
        },
        FilterOp::ContainsI => match (actual.and_then(scalar_text), scalar_text(data)) {
            (Some(a), Some(b)) => a.to_lowercase().contains(&b.to_lowercase()),
            _ => false,
        },
        FilterOp::Null => is_missing(actual) == data.as_bool().unwrap_or(true),
        FilterOp::NotNull => is_missing(actual) != data.as_bool().unwrap_or(true),
    }
}

/// Orders records by the given sort fields, missing values last, then by id
pub fn sort_records(records: &mut [Map<String, Value>], sort: &[FilterOrderInfo]) {
    records.sort_by(|a, b| {
        for info in sort {
            let ord = compare_sort_values(a.get(&info.field), b.get(&info.field));
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        compare_sort_values(a.get("id"), b.get("id"))
    });
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => scalar_text(x).cmp(&scalar_text(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterWhere;
    use serde_json::json;
    use std::collections::HashMap;

    struct Fixture {
        pages: HashMap<String, Map<String, Value>>,
    }

    impl RelationResolver for Fixture {
        fn load(&self, collection: Collection, id: &Value) -> Option<Map<String, Value>> {
            match collection {
                Collection::Pages => self.pages.get(&scalar_text(id)?).cloned(),
                _ => None,
            }
        }
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn fixture() -> Fixture {
        let mut pages = HashMap::new();
        pages.insert("5".to_string(), obj(json!({ "id": 5, "slug": "home", "application": 42 })));
        Fixture { pages }
    }

    #[test]
    fn loose_equality_between_number_and_string() {
        let fx = fixture();
        let m = FilterMatcher::new(&fx);
        let page = obj(json!({ "id": 5, "application": 42 }));
        let expr = FilterWhere::parse(&json!({ "application": { "id": { "$eq": "42" } } })).unwrap();
        assert!(m.matches(&expr, Collection::Pages, &page));
    }

    #[test]
    fn nested_relation_filter_walks_into_parent() {
        let fx = fixture();
        let m = FilterMatcher::new(&fx);
        let block = obj(json!({ "id": 1, "page": 5, "blockType": "hero" }));
        let hit = FilterWhere::parse(&json!({ "page": { "application": { "id": { "$eq": "42" } } } })).unwrap();
        let miss = FilterWhere::parse(&json!({ "page": { "application": { "id": { "$eq": "7" } } } })).unwrap();
        assert!(m.matches(&hit, Collection::ContentBlocks, &block));
        assert!(!m.matches(&miss, Collection::ContentBlocks, &block));
    }

    #[test]
    fn null_in_and_or_operators() {
        let fx = fixture();
        let m = FilterMatcher::new(&fx);
        let rec = obj(json!({ "id": 2, "slug": "about", "order": 3 }));
        let cases = [
            (json!({ "image": { "$null": true } }), true),
            (json!({ "slug": { "$notNull": true } }), true),
            (json!({ "slug": { "$in": ["home", "about"] } }), true),
            (json!({ "order": { "$gt": "2" } }), true),
            (json!({ "$or": [{ "slug": "x" }, { "order": 3 }] }), true),
            (json!({ "$not": { "slug": "about" } }), false),
        ];
        for (filter, expected) in cases {
            let expr = FilterWhere::parse(&filter).unwrap();
            assert_eq!(m.matches(&expr, Collection::Pages, &rec), expected, "filter {}", filter);
        }
    }

    #[test]
    fn sorts_numbers_numerically_with_missing_last() {
        let mut records = vec![
            obj(json!({ "id": 1, "order": 10 })),
            obj(json!({ "id": 2 })),
            obj(json!({ "id": 3, "order": 2 })),
        ];
        sort_records(&mut records, &[FilterOrderInfo::asc("order")]);
        let ids: Vec<_> = records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(1), json!(2)]);
    }
}
