use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators accepted inside a `filters` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$eqi")] Eqi,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,
    #[serde(rename = "$in")] In,
    #[serde(rename = "$notIn")] NotIn,
    #[serde(rename = "$contains")] Contains,
    #[serde(rename = "$containsi")] ContainsI,
    #[serde(rename = "$null")] Null,
    #[serde(rename = "$notNull")] NotNull,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<Self> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$eqi" => FilterOp::Eqi,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$notIn" => FilterOp::NotIn,
            "$contains" => FilterOp::Contains,
            "$containsi" => FilterOp::ContainsI,
            "$null" => FilterOp::Null,
            "$notNull" => FilterOp::NotNull,
            _ => return None,
        })
    }
}

/// One leaf predicate: a dotted field path (which may cross relations), an operator and its operand
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub path: Vec<String>,
    pub operator: FilterOp,
    pub data: Value,
}

impl FilterCondition {
    pub fn eq(path: &[&str], data: impl Into<Value>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            operator: FilterOp::Eq,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Condition(FilterCondition),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn all() -> Self {
        FilterExpr::And(vec![])
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FilterExpr::And(items) if items.is_empty())
    }

    /// Conjoin another expression, flattening nested ANDs
    pub fn and(self, other: FilterExpr) -> Self {
        match (self, other) {
            (FilterExpr::And(mut a), FilterExpr::And(b)) => {
                a.extend(b);
                FilterExpr::And(a)
            }
            (FilterExpr::And(mut a), other) => {
                a.push(other);
                FilterExpr::And(a)
            }
            (this, FilterExpr::And(mut b)) => {
                b.insert(0, this);
                FilterExpr::And(b)
            }
            (this, other) => FilterExpr::And(vec![this, other]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub field: String,
    pub sort: SortDirection,
}

impl FilterOrderInfo {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), sort: SortDirection::Asc }
    }
}

/// Which variant of a document a query reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    #[default]
    Published,
}

impl Status {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Status::Draft),
            "published" => Some(Status::Published),
            _ => None,
        }
    }
}

impl Default for FilterExpr {
    fn default() -> Self {
        FilterExpr::all()
    }
}
