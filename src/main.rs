use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use cms_api_rust::config::config;
use cms_api_rust::database::DatabaseManager;
use cms_api_rust::services::bootstrap::backfill_api_keys;
use cms_api_rust::{app, is_development, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, CMS_API_TOKENS, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting CMS API in {:?} mode", config.environment);
    if is_development!() && config.security.allow_anonymous_writes {
        tracing::warn!("Anonymous writes are enabled; never run this configuration in production");
    }

    let store = DatabaseManager::open_store(&config.database)
        .await
        .context("failed to open content store")?;
    backfill_api_keys(store.as_ref())
        .await
        .context("failed to backfill application API keys")?;

    let router = app(AppState::new(Arc::clone(&store), config.clone()));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("CMS API listening on http://{}", bind_addr);

    let served = axum::serve(listener, router).await;
    store.close().await;
    served.context("server error")
}
