use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::database::ContentStore;
use crate::error::ApiError;
use crate::filter::{FindQuery, Status};
use crate::models::api_token::hash_secret;
use crate::models::Collection;

/// Identity of the caller behind a write request
#[derive(Clone, Debug, PartialEq)]
pub enum AuthToken {
    /// One of the statically configured tokens
    Static,
    /// A stored API token, by name
    Stored(String),
    /// No credential; accepted because anonymous writes are enabled
    Anonymous,
}

/// Bearer-token check for mutating requests. Reads pass through untouched.
pub async fn api_token_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }

    let security = &state.config.security;
    let token = match extract_bearer_from_headers(&headers) {
        Ok(token) => token,
        Err(_) if security.allow_anonymous_writes => {
            request.extensions_mut().insert(AuthToken::Anonymous);
            return next.run(request).await;
        }
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    match authenticate(state.store.as_ref(), &security.api_tokens, &token).await {
        Ok(Some(identity)) => {
            tracing::debug!("Authenticated write as {:?}", identity);
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => ApiError::unauthorized("Invalid API token").into_response(),
        Err(e) => e.into_response(),
    }
}

/// Matches a bearer secret against static tokens, then stored token hashes
pub async fn authenticate(
    store: &dyn ContentStore,
    static_tokens: &[String],
    token: &str,
) -> Result<Option<AuthToken>, ApiError> {
    if static_tokens.iter().any(|t| t == token) {
        return Ok(Some(AuthToken::Static));
    }

    let query = FindQuery::new(Status::Draft)
        .where_eq(&["accessKey"], hash_secret(token))
        .limit(1);
    let found = store.find(Collection::ApiTokens, &query).await?;
    Ok(found.into_iter().next().map(|row| {
        let name = row.get("name").and_then(|v| v.as_str()).unwrap_or_default();
        AuthToken::Stored(name.to_string())
    }))
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
