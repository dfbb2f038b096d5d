use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::models::Collection;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let collections: Vec<&str> = Collection::ALL
        .iter()
        .filter(|c| c.is_public())
        .map(|c| c.name())
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "CMS API (Rust)",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant site content API",
            "collections": collections,
            "endpoints": {
                "collections": "/api/:collection[/:id[/publish]]",
                "site": "/api/applications/domain/:domain (public)",
                "page": "/api/applications/domain/:domain/page/*path (public)",
                "health": "/_health",
            }
        }
    }))
}

/// GET /_health - Store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
