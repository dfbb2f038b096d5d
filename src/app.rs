use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::SharedStore;
use crate::handlers::{collections, lookup, system};
use crate::middleware::{api_token_middleware, tenant_filter_middleware, RequestQuery, TenantFilter};
use crate::models::Collection;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<AppConfig>,
    pub tenant_filter: Arc<TenantFilter>,
}

impl AppState {
    pub fn new(store: SharedStore, config: AppConfig) -> Self {
        let tenant_filter = Arc::new(TenantFilter::from_config(&config));
        Self {
            store,
            config: Arc::new(config),
            tenant_filter,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let collection_routes = Collection::ALL
        .into_iter()
        .filter(Collection::is_public)
        .fold(Router::new(), |router, collection| router.merge(collection_routes(collection)))
        .route_layer(from_fn_with_state(state.clone(), api_token_middleware));

    let router = Router::new()
        // Public
        .route("/", get(system::root))
        .route(&config.api.health_prefix, get(system::health))
        // Site lookup (no auth)
        .merge(lookup_routes())
        // Collections (writes require a token)
        .merge(collection_routes)
        // Global middleware
        .layer(from_fn_with_state(state.clone(), tenant_filter_middleware))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config));

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/applications/domain", get(lookup::missing_domain))
        .route("/api/applications/domain/:domain", get(lookup::find_by_domain))
        .route("/api/applications/domain/:domain/page", get(lookup::find_root_page))
        .route("/api/applications/domain/:domain/page/*path", get(lookup::find_page_by_path))
}

fn collection_routes(collection: Collection) -> Router<AppState> {
    let base = format!("/api/{}", collection.name());

    Router::new()
        .route(
            &base,
            get(move |State(state): State<AppState>, query: RequestQuery| {
                collections::list(collection, state, query)
            })
            .post(move |State(state): State<AppState>, Json(payload): Json<Value>| {
                collections::create(collection, state, payload)
            }),
        )
        .route(
            &format!("{}/:id", base),
            get(
                move |State(state): State<AppState>, Path(id): Path<i64>, query: RequestQuery| {
                    collections::get_one(collection, state, id, query)
                },
            )
            .put(
                move |State(state): State<AppState>, Path(id): Path<i64>, Json(payload): Json<Value>| {
                    collections::update(collection, state, id, payload)
                },
            ),
        )
        .route(
            &format!("{}/:id/publish", base),
            post(move |State(state): State<AppState>, Path(id): Path<i64>| {
                collections::publish(collection, state, id)
            }),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors || config.security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
