use super::error::FilterError;
use super::matcher::scalar_text;
use super::types::{FilterCondition, FilterExpr, FilterOp, FilterOrderInfo};
use crate::models::Collection;

/// A bound parameter for generated SQL; everything compares as text
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
}

const NUMERIC_PATTERN: &str = "'^-?[0-9]+(\\.[0-9]+)?$'";

/// Translates filter trees into predicates over the `documents` table.
///
/// Scalars are read from the jsonb variant column with `->>` (or `#>>` for
/// nested paths) and compared as text. Relation hops become correlated
/// `EXISTS` sub-selects against the related document's draft.
#[derive(Debug, Clone)]
pub struct FilterSql {
    params: Vec<SqlParam>,
    param_offset: usize,
    alias_counter: usize,
}

impl FilterSql {
    pub fn new(param_offset: usize) -> Self {
        Self {
            params: vec![],
            param_offset,
            alias_counter: 0,
        }
    }

    pub fn into_params(self) -> Vec<SqlParam> {
        self.params
    }

    pub fn where_clause(
        &mut self,
        expr: &FilterExpr,
        collection: Collection,
        alias: &str,
        column: &str,
    ) -> Result<String, FilterError> {
        match expr {
            FilterExpr::Condition(condition) => self.condition(condition, collection, alias, column),
            FilterExpr::And(parts) | FilterExpr::Or(parts) => {
                if parts.is_empty() {
                    return Ok(if matches!(expr, FilterExpr::And(_)) { "TRUE" } else { "FALSE" }.to_string());
                }
                let joiner = if matches!(expr, FilterExpr::And(_)) { " AND " } else { " OR " };
                let mut sql_parts = Vec::with_capacity(parts.len());
                for part in parts {
                    sql_parts.push(format!("({})", self.where_clause(part, collection, alias, column)?));
                }
                Ok(sql_parts.join(joiner))
            }
            FilterExpr::Not(inner) => Ok(format!(
                "NOT ({})",
                self.where_clause(inner, collection, alias, column)?
            )),
        }
    }

    pub fn order_clause(&mut self, sort: &[FilterOrderInfo], alias: &str, column: &str) -> String {
        let mut parts: Vec<String> = sort
            .iter()
            .map(|info| {
                let expr = if info.field == "id" {
                    format!("{}.id", alias)
                } else {
                    format!("({}.{} -> {})", alias, column, self.param(SqlParam::Text(info.field.clone())))
                };
                format!("{} {} NULLS LAST", expr, info.sort.to_sql())
            })
            .collect();
        parts.push(format!("{}.id ASC", alias));
        format!("ORDER BY {}", parts.join(", "))
    }

    fn condition(
        &mut self,
        condition: &FilterCondition,
        collection: Collection,
        alias: &str,
        column: &str,
    ) -> Result<String, FilterError> {
        let (head, tail) = condition
            .path
            .split_first()
            .ok_or_else(|| FilterError::InvalidWhereClause("empty field path".to_string()))?;

        if let Some(target) = collection.relation_target(head) {
            let walks_into_target = !tail.is_empty() && !(tail.len() == 1 && tail[0] == "id");
            if walks_into_target {
                self.alias_counter += 1;
                let related = format!("r{}", self.alias_counter);
                let key = self.param(SqlParam::Text(head.clone()));
                let nested = FilterCondition {
                    path: tail.to_vec(),
                    operator: condition.operator,
                    data: condition.data.clone(),
                };
                let inner = self.condition(&nested, target, &related, "draft")?;
                return Ok(format!(
                    "EXISTS (SELECT 1 FROM documents {r} WHERE {r}.collection = '{c}' AND {r}.id::text = ({a}.{col} ->> {k}) AND {inner})",
                    r = related,
                    c = target.name(),
                    a = alias,
                    col = column,
                    k = key,
                    inner = inner,
                ));
            }
            let key = self.param(SqlParam::Text(head.clone()));
            let expr = format!("({}.{} ->> {})", alias, column, key);
            return self.operator_sql(&expr, condition);
        }

        let expr = match (head.as_str(), tail.is_empty()) {
            ("id", true) => format!("{}.id::text", alias),
            ("documentId", true) => format!("{}.document_id::text", alias),
            ("publishedAt", true) => format!("{}.published_at::text", alias),
            ("createdAt", true) => format!("{}.created_at::text", alias),
            ("updatedAt", true) => format!("{}.updated_at::text", alias),
            (_, true) => {
                let key = self.param(SqlParam::Text(head.clone()));
                format!("({}.{} ->> {})", alias, column, key)
            }
            (_, false) => {
                let key = self.param(SqlParam::TextArray(condition.path.clone()));
                format!("({}.{} #>> {}::text[])", alias, column, key)
            }
        };
        self.operator_sql(&expr, condition)
    }

    fn operator_sql(&mut self, expr: &str, condition: &FilterCondition) -> Result<String, FilterError> {
        let data = &condition.data;
        Ok(match condition.operator {
            FilterOp::Eq => match scalar_text(data) {
                None => format!("{} IS NULL", expr),
                Some(text) => format!("{} = {}", expr, self.param(SqlParam::Text(text))),
            },
            FilterOp::Ne => match scalar_text(data) {
                None => format!("{} IS NOT NULL", expr),
                Some(text) => format!("{} IS DISTINCT FROM {}", expr, self.param(SqlParam::Text(text))),
            },
            FilterOp::Eqi => {
                let text = self.scalar(condition)?;
                format!("lower({}) = lower({})", expr, self.param(SqlParam::Text(text)))
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let op = match condition.operator {
                    FilterOp::Gt => ">",
                    FilterOp::Gte => ">=",
                    FilterOp::Lt => "<",
                    _ => "<=",
                };
                let text = self.scalar(condition)?;
                if text.parse::<f64>().is_ok() {
                    let p = self.param(SqlParam::Text(text));
                    format!(
                        "(CASE WHEN {e} ~ {pat} THEN ({e})::numeric END) {op} {p}::numeric",
                        e = expr,
                        pat = NUMERIC_PATTERN,
                        op = op,
                        p = p,
                    )
                } else {
                    format!("{} {} {}", expr, op, self.param(SqlParam::Text(text)))
                }
            }
            FilterOp::In | FilterOp::NotIn => {
                let values: Vec<String> = data
                    .as_array()
                    .map(|items| items.iter().filter_map(scalar_text).collect())
                    .unwrap_or_default();
                let p = self.param(SqlParam::TextArray(values));
                if condition.operator == FilterOp::In {
                    format!("{} = ANY({}::text[])", expr, p)
                } else {
                    format!("({e} IS NULL OR NOT ({e} = ANY({p}::text[])))", e = expr, p = p)
                }
            }
            FilterOp::Contains | FilterOp::ContainsI => {
                let text = self.scalar(condition)?;
                let pattern = format!("%{}%", escape_like(&text));
                let like = if condition.operator == FilterOp::Contains { "LIKE" } else { "ILIKE" };
                format!("{} {} {}", expr, like, self.param(SqlParam::Text(pattern)))
            }
            FilterOp::Null | FilterOp::NotNull => {
                let wants_null = data.as_bool().unwrap_or(true) == (condition.operator == FilterOp::Null);
                if wants_null {
                    format!("{} IS NULL", expr)
                } else {
                    format!("{} IS NOT NULL", expr)
                }
            }
        })
    }

    fn scalar(&self, condition: &FilterCondition) -> Result<String, FilterError> {
        scalar_text(&condition.data).ok_or_else(|| {
            FilterError::InvalidOperatorData(format!(
                "{:?} on '{}' requires a scalar operand",
                condition.operator,
                condition.path.join(".")
            ))
        })
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.param_offset + self.params.len())
    }
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterOrderInfo, FilterWhere};
    use serde_json::json;

    #[test]
    fn relation_id_shortcut_reads_foreign_key() {
        let expr = FilterWhere::parse(&json!({ "application": { "id": { "$eq": "42" } } })).unwrap();
        let mut sql = FilterSql::new(1);
        let clause = sql.where_clause(&expr, Collection::Pages, "d", "published").unwrap();
        assert_eq!(clause, "(d.published ->> $2) = $3");
        assert_eq!(
            sql.into_params(),
            vec![SqlParam::Text("application".into()), SqlParam::Text("42".into())]
        );
    }

    #[test]
    fn nested_relation_becomes_exists_subselect() {
        let expr = FilterWhere::parse(&json!({ "page": { "application": { "id": { "$eq": "42" } } } })).unwrap();
        let mut sql = FilterSql::new(1);
        let clause = sql.where_clause(&expr, Collection::ContentBlocks, "d", "published").unwrap();
        assert!(clause.starts_with("EXISTS (SELECT 1 FROM documents r1 WHERE r1.collection = 'pages'"));
        assert!(clause.contains("r1.id::text = (d.published ->> $2)"));
        assert!(clause.contains("(r1.draft ->> $3) = $4"));
    }

    #[test]
    fn field_names_are_bound_not_inlined() {
        let expr = FilterWhere::parse(&json!({ "seo": { "title": { "$containsi": "50%" } } })).unwrap();
        let mut sql = FilterSql::new(0);
        let clause = sql.where_clause(&expr, Collection::Pages, "d", "draft").unwrap();
        assert_eq!(clause, "(d.draft #>> $1::text[]) ILIKE $2");
        let params = sql.into_params();
        assert_eq!(params[1], SqlParam::Text("%50\\%%".into()));
    }

    #[test]
    fn order_clause_always_breaks_ties_by_id() {
        let mut sql = FilterSql::new(3);
        let clause = sql.order_clause(&[FilterOrderInfo::asc("order")], "d", "published");
        assert_eq!(clause, "ORDER BY (d.published -> $4) ASC NULLS LAST, d.id ASC");
    }
}
