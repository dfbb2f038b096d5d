use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use serde_json::{json, Map, Value};
use std::convert::Infallible;

use crate::app::AppState;
use crate::config::AppConfig;
use crate::filter::{parse_query, query_param};

/// The decoded request query, as handed to collection handlers.
///
/// Set by [`tenant_filter_middleware`]; when the middleware did not run the
/// extractor decodes the raw query string itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestQuery(pub Value);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestQuery {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(query) = parts.extensions.get::<RequestQuery>() {
            return Ok(query.clone());
        }
        Ok(RequestQuery(parse_query(parts.uri.query().unwrap_or(""))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    Admin,
    Health,
    OutsideApi,
    TenantManagement,
}

/// What the filter did to a request
#[derive(Debug, Clone, PartialEq)]
pub enum TenantFilterOutcome {
    Bypassed(BypassReason),
    /// Not a GET, or not a tenant-scoped collection
    NotApplicable,
    /// No tenant id on the request; the read proceeds unscoped
    NoTenant,
    Applied { tenant_id: String, field: &'static str },
}

/// Tenant scoping rules resolved from configuration
#[derive(Debug, Clone)]
pub struct TenantFilter {
    admin_prefix: String,
    health_prefix: String,
    public_prefix: String,
    tenant_management_prefix: String,
    header_name: String,
    query_param: String,
}

impl TenantFilter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            admin_prefix: config.api.admin_prefix.clone(),
            health_prefix: config.api.health_prefix.clone(),
            public_prefix: config.api.public_prefix.clone(),
            tenant_management_prefix: config.api.tenant_management_prefix.clone(),
            header_name: config.tenancy.header_name.clone(),
            query_param: config.tenancy.query_param.clone(),
        }
    }

    /// Injects the tenant equality filter into `query` when the request is a
    /// GET against pages or content blocks and carries a tenant id.
    pub fn apply(&self, method: &Method, path: &str, headers: &HeaderMap, query: &mut Value) -> TenantFilterOutcome {
        if under_prefix(path, &self.admin_prefix) {
            return TenantFilterOutcome::Bypassed(BypassReason::Admin);
        }
        if under_prefix(path, &self.health_prefix) {
            return TenantFilterOutcome::Bypassed(BypassReason::Health);
        }
        if !under_prefix(path, &self.public_prefix) {
            return TenantFilterOutcome::Bypassed(BypassReason::OutsideApi);
        }
        if under_prefix(path, &self.tenant_management_prefix) {
            return TenantFilterOutcome::Bypassed(BypassReason::TenantManagement);
        }

        if *method != Method::GET {
            return TenantFilterOutcome::NotApplicable;
        }

        let (field, filter_path): (&'static str, &[&str]) =
            if under_prefix(path, &format!("{}/pages", self.public_prefix)) {
                ("application", &["application", "id", "$eq"])
            } else if under_prefix(path, &format!("{}/content-blocks", self.public_prefix)) {
                ("page.application", &["page", "application", "id", "$eq"])
            } else {
                return TenantFilterOutcome::NotApplicable;
            };

        let Some(tenant_id) = self.tenant_id(headers, query) else {
            return TenantFilterOutcome::NoTenant;
        };

        inject_filter(query, filter_path, Value::String(tenant_id.clone()));
        TenantFilterOutcome::Applied { tenant_id, field }
    }

    /// Header wins over the query parameter; blank values count as absent
    fn tenant_id(&self, headers: &HeaderMap, query: &Value) -> Option<String> {
        let from_header = headers
            .get(self.header_name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let from_query = query_param(query, &self.query_param)
            .map(str::trim)
            .filter(|v| !v.is_empty());
        from_header.or(from_query).map(str::to_string)
    }
}

/// [`TenantFilter::apply`] using the process configuration
pub fn apply_tenant_filter(method: &Method, path: &str, headers: &HeaderMap, query: &mut Value) -> TenantFilterOutcome {
    TenantFilter::from_config(crate::config::config()).apply(method, path, headers, query)
}

pub async fn tenant_filter_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut query = parse_query(request.uri().query().unwrap_or(""));
    let outcome = state
        .tenant_filter
        .apply(request.method(), request.uri().path(), request.headers(), &mut query);

    match &outcome {
        TenantFilterOutcome::Applied { tenant_id, field } => {
            tracing::debug!("Scoped {} to {} = {}", request.uri().path(), field, tenant_id);
        }
        TenantFilterOutcome::NoTenant => {
            tracing::debug!("No tenant id on {}, read is unscoped", request.uri().path());
        }
        _ => {}
    }

    request.extensions_mut().insert(RequestQuery(query));
    next.run(request).await
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Sets `filters.<path...> = value`, keeping any filters already present.
/// When the existing filters cannot take the nested key, both are joined
/// under `$and`.
fn inject_filter(query: &mut Value, path: &[&str], value: Value) {
    if !query.is_object() {
        *query = Value::Object(Map::new());
    }
    let Value::Object(root) = query else { return };

    let scoped = path.iter().rev().fold(value, |inner, key| {
        let mut wrapper = Map::new();
        wrapper.insert(key.to_string(), inner);
        Value::Object(wrapper)
    });

    match root.remove("filters") {
        None | Some(Value::Null) => {
            root.insert("filters".into(), scoped);
        }
        Some(Value::Object(mut existing)) if can_merge(&existing, path) => {
            merge_into(&mut existing, scoped);
            root.insert("filters".into(), Value::Object(existing));
        }
        Some(existing) => {
            root.insert("filters".into(), json!({ "$and": [existing, scoped] }));
        }
    }
}

fn can_merge(filters: &Map<String, Value>, path: &[&str]) -> bool {
    let mut node = filters;
    for key in &path[..path.len().saturating_sub(1)] {
        match node.get(*key) {
            None => return true,
            Some(Value::Object(child)) => node = child,
            Some(_) => return false,
        }
    }
    true
}

fn merge_into(target: &mut Map<String, Value>, source: Value) {
    let Value::Object(source) = source else { return };
    for (key, value) in source {
        match value {
            Value::Object(_) if matches!(target.get(&key), Some(Value::Object(_))) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_into(existing, value);
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn filter() -> TenantFilter {
        TenantFilter::from_config(&AppConfig::development())
    }

    fn headers_with_tenant(id: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-application-id", HeaderValue::from_static(id));
        headers
    }

    #[test]
    fn query_param_tenant_scopes_pages() {
        let mut query = parse_query("applicationId=42");
        let outcome = filter().apply(&Method::GET, "/api/pages", &HeaderMap::new(), &mut query);

        assert!(matches!(outcome, TenantFilterOutcome::Applied { .. }));
        assert_eq!(query["filters"]["application"]["id"]["$eq"], json!("42"));
    }

    #[test]
    fn admin_prefix_leaves_query_untouched() {
        let mut query = parse_query("applicationId=42");
        let before = query.clone();
        let outcome = filter().apply(&Method::GET, "/admin/pages", &HeaderMap::new(), &mut query);

        assert_eq!(outcome, TenantFilterOutcome::Bypassed(BypassReason::Admin));
        assert_eq!(query, before);
    }

    #[test]
    fn header_takes_precedence_over_query() {
        let mut query = parse_query("applicationId=42");
        filter().apply(&Method::GET, "/api/pages", &headers_with_tenant("7"), &mut query);
        assert_eq!(query["filters"]["application"]["id"]["$eq"], json!("7"));
    }

    #[test]
    fn blocks_are_scoped_through_their_page() {
        let mut query = Value::Null;
        filter().apply(&Method::GET, "/api/content-blocks", &headers_with_tenant("5"), &mut query);
        assert_eq!(query["filters"]["page"]["application"]["id"]["$eq"], json!("5"));
    }

    #[test]
    fn mutations_and_other_collections_are_not_filtered() {
        let headers = headers_with_tenant("5");
        let mut query = Value::Null;
        assert_eq!(
            filter().apply(&Method::POST, "/api/pages", &headers, &mut query),
            TenantFilterOutcome::NotApplicable
        );
        assert_eq!(
            filter().apply(&Method::GET, "/api/api-tokens", &headers, &mut query),
            TenantFilterOutcome::NotApplicable
        );
        assert_eq!(query, Value::Null);
    }

    #[test]
    fn bypasses_health_tenant_management_and_non_api_paths() {
        let headers = headers_with_tenant("5");
        let mut query = Value::Null;
        let f = filter();
        assert_eq!(
            f.apply(&Method::GET, "/_health", &headers, &mut query),
            TenantFilterOutcome::Bypassed(BypassReason::Health)
        );
        assert_eq!(
            f.apply(&Method::GET, "/api/applications/domain/a.test", &headers, &mut query),
            TenantFilterOutcome::Bypassed(BypassReason::TenantManagement)
        );
        assert_eq!(
            f.apply(&Method::GET, "/apiary", &headers, &mut query),
            TenantFilterOutcome::Bypassed(BypassReason::OutsideApi)
        );
    }

    #[test]
    fn missing_tenant_leaves_read_unscoped() {
        let mut query = parse_query("filters[slug]=home");
        let before = query.clone();
        assert_eq!(
            filter().apply(&Method::GET, "/api/pages", &HeaderMap::new(), &mut query),
            TenantFilterOutcome::NoTenant
        );
        assert_eq!(query, before);
    }

    #[test]
    fn existing_filters_are_kept() {
        let mut query = parse_query("filters[slug][$eq]=home&filters[application][name]=x");
        filter().apply(&Method::GET, "/api/pages", &headers_with_tenant("3"), &mut query);
        assert_eq!(query["filters"]["slug"]["$eq"], json!("home"));
        assert_eq!(query["filters"]["application"]["name"], json!("x"));
        assert_eq!(query["filters"]["application"]["id"]["$eq"], json!("3"));

        let mut query = parse_query("filters[application]=9");
        filter().apply(&Method::GET, "/api/pages", &headers_with_tenant("3"), &mut query);
        assert_eq!(query["filters"]["$and"][0]["application"], json!("9"));
        assert_eq!(query["filters"]["$and"][1]["application"]["id"]["$eq"], json!("3"));
    }
}
