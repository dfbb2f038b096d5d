use serde_json::{json, Map, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::{FindQuery, Status};
use crate::middleware::{ApiResponse, ApiResult, RequestQuery};
use crate::models::Collection;

/// GET /api/:collection - Filtered, sorted, paginated list
pub async fn list(collection: Collection, state: AppState, RequestQuery(query): RequestQuery) -> ApiResult<Value> {
    let api = &state.config.api;
    let find = FindQuery::from_request_query(&query, api.default_page_size, api.max_page_size)?;

    let rows = state.store.find(collection, &find).await?;
    let total = state.store.count(collection, &find).await?;

    let meta = json!({
        "pagination": {
            "start": find.offset,
            "limit": find.limit,
            "total": total,
        }
    });
    let data = Value::Array(rows.into_iter().map(Value::Object).collect());
    Ok(ApiResponse::success(data).with_meta(meta))
}

/// GET /api/:collection/:id - One record; `status=draft` selects the draft.
/// Any `filters` in the query (including the tenant scope) still apply.
pub async fn get_one(
    collection: Collection,
    state: AppState,
    id: i64,
    RequestQuery(query): RequestQuery,
) -> ApiResult<Value> {
    let api = &state.config.api;
    let mut find = FindQuery::from_request_query(&query, api.default_page_size, api.max_page_size)?
        .where_eq(&["id"], id)
        .limit(1);
    find.offset = 0;

    let record = state
        .store
        .find(collection, &find)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("{} {} not found", collection, id)))?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// POST /api/:collection - Create from `{ data: {...} }`
pub async fn create(collection: Collection, state: AppState, payload: Value) -> ApiResult<Value> {
    let data = body_data(payload)?;
    let document = state.store.create(collection, data).await?;
    tracing::info!("Created {} {}", collection, document.id);
    Ok(ApiResponse::created(draft_json(&document)?))
}

/// PUT /api/:collection/:id - Update the draft from `{ data: {...} }`
pub async fn update(collection: Collection, state: AppState, id: i64, payload: Value) -> ApiResult<Value> {
    let data = body_data(payload)?;
    let document = state.store.update(collection, id, data).await?;
    Ok(ApiResponse::success(draft_json(&document)?))
}

/// POST /api/:collection/:id/publish - Snapshot the draft as published
pub async fn publish(collection: Collection, state: AppState, id: i64) -> ApiResult<Value> {
    let document = state.store.publish(collection, id).await?;
    tracing::info!("Published {} {}", collection, id);
    let record = document
        .to_json(Status::Published)
        .ok_or_else(|| ApiError::internal_server_error("Published variant missing after publish"))?;
    Ok(ApiResponse::success(Value::Object(record)))
}

fn body_data(payload: Value) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Object(data)) => Ok(data),
            _ => Err(ApiError::bad_request("Request body must be { \"data\": { ... } }")),
        },
        _ => Err(ApiError::invalid_json("Request body must be a JSON object")),
    }
}

fn draft_json(document: &crate::database::Document) -> Result<Value, ApiError> {
    document
        .to_json(Status::Draft)
        .map(Value::Object)
        .ok_or_else(|| ApiError::internal_server_error("Draft variant missing"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_must_wrap_data() {
        assert!(body_data(json!({ "data": { "name": "x" } })).is_ok());
        assert_eq!(body_data(json!({ "name": "x" })).unwrap_err().status_code(), 400);
        assert_eq!(body_data(json!([1])).unwrap_err().error_code(), "INVALID_JSON");
    }
}
