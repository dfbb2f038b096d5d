#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use cms_api_rust::config::AppConfig;
use cms_api_rust::database::{MemoryStore, SharedStore};
use cms_api_rust::{app, AppState};

pub const TOKEN: &str = "test-token";

/// An API served in-process over a fresh in-memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: SharedStore,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn(config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store: SharedStore = Arc::new(MemoryStore::new());
        let router = app(AppState::new(store.clone(), config));
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            port,
            base_url,
            store,
            client: reqwest::Client::new(),
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/_health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).header(name, value).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    /// POST `{ data }` with the test bearer token; returns the created id
    pub async fn create(&self, collection: &str, data: Value) -> Result<i64> {
        let res = self
            .client
            .post(self.url(&format!("/api/{}", collection)))
            .bearer_auth(TOKEN)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let status = res.status();
        let body: Value = res.json().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create {} returned {}: {}", collection, status, body);
        body["data"]["id"].as_i64().context("created record has no id")
    }

    pub async fn publish(&self, collection: &str, id: i64) -> Result<()> {
        let res = self
            .client
            .post(self.url(&format!("/api/{}/{}/publish", collection, id)))
            .bearer_auth(TOKEN)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "publish {} {} returned {}", collection, id, res.status());
        Ok(())
    }
}

/// Development defaults with anonymous writes off and one static token
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.allow_anonymous_writes = false;
    config.security.api_tokens = vec![TOKEN.to_string()];
    config
}

pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn(test_config()).await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// Application `acme.test` with an unpublished Home page holding a hero and a footer block.
/// Returns (application id, page id).
pub async fn seed_site(server: &TestServer, domain: &str) -> Result<(i64, i64)> {
    let app_id = server
        .create("applications", json!({ "name": "Acme", "domain": domain, "globalStyles": { "primaryColor": "#f00" } }))
        .await?;
    let page_id = server
        .create("pages", json!({ "title": "Home", "slug": "home", "path": "/", "application": app_id }))
        .await?;
    server
        .create("content-blocks", json!({ "blockType": "footer", "order": 2, "page": page_id }))
        .await?;
    server
        .create("content-blocks", json!({ "blockType": "hero", "order": 1, "page": page_id, "content": { "title": "Welcome" } }))
        .await?;
    Ok((app_id, page_id))
}
