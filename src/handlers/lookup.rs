use axum::extract::{Path, State};
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LookupError, LookupService};

/// GET /api/applications/domain - No domain given
pub async fn missing_domain() -> ApiResult<Value> {
    Err(LookupError::MissingDomain.into())
}

/// GET /api/applications/domain/:domain - Site with published pages and visible blocks
pub async fn find_by_domain(State(state): State<AppState>, Path(domain): Path<String>) -> ApiResult<Value> {
    let application = LookupService::new(state.store.as_ref()).find_by_domain(&domain).await?;
    Ok(ApiResponse::success(Value::Object(application)))
}

/// GET /api/applications/domain/:domain/page - The root page
pub async fn find_root_page(State(state): State<AppState>, Path(domain): Path<String>) -> ApiResult<Value> {
    let found = LookupService::new(state.store.as_ref())
        .find_page_by_path(&domain, "")
        .await?;
    Ok(ApiResponse::success(Value::Object(found)))
}

/// GET /api/applications/domain/:domain/page/*path - A page by its path
pub async fn find_page_by_path(
    State(state): State<AppState>,
    Path((domain, path)): Path<(String, String)>,
) -> ApiResult<Value> {
    let found = LookupService::new(state.store.as_ref())
        .find_page_by_path(&domain, &path)
        .await?;
    Ok(ApiResponse::success(Value::Object(found)))
}
