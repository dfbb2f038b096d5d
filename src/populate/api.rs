use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use super::error::PopulateError;
use crate::models::Collection;

/// Result of a create call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    /// A record with the same natural key already exists
    Conflict,
}

/// The REST operations the populator needs
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn create(&self, collection: Collection, data: &Map<String, Value>) -> Result<CreateOutcome, PopulateError>;

    /// Id of the first draft matching every `filters[field]=value` pair
    async fn find_id(&self, collection: Collection, filters: &[(&str, String)]) -> Result<Option<i64>, PopulateError>;

    async fn publish(&self, collection: Collection, id: i64) -> Result<(), PopulateError>;

    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Talks to a running API over HTTP with a bearer token
pub struct HttpApi {
    client: Client,
    base: Url,
    token: String,
}

impl HttpApi {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, PopulateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PopulateError> {
        Ok(self.base.join(path)?)
    }

    async fn read_json(collection: Collection, response: reqwest::Response) -> Result<Value, PopulateError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PopulateError::Status {
                collection,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ContentApi for HttpApi {
    async fn create(&self, collection: Collection, data: &Map<String, Value>) -> Result<CreateOutcome, PopulateError> {
        let url = self.endpoint(&format!("/api/{}", collection.name()))?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "data": data }))
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::Conflict);
        }
        let body = Self::read_json(collection, response).await?;
        body.pointer("/data/id")
            .and_then(Value::as_i64)
            .map(CreateOutcome::Created)
            .ok_or(PopulateError::MissingId(collection))
    }

    async fn find_id(&self, collection: Collection, filters: &[(&str, String)]) -> Result<Option<i64>, PopulateError> {
        let url = self.endpoint(&format!("/api/{}", collection.name()))?;
        let mut query: Vec<(String, String)> = filters
            .iter()
            .map(|(field, value)| (format!("filters[{}]", field), value.clone()))
            .collect();
        query.push(("status".into(), "draft".into()));

        debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await?;
        let body = Self::read_json(collection, response).await?;
        Ok(body
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64))
    }

    async fn publish(&self, collection: Collection, id: i64) -> Result<(), PopulateError> {
        let url = self.endpoint(&format!("/api/{}/{}/publish", collection.name(), id))?;
        let response = self.client.post(url).bearer_auth(&self.token).send().await?;
        Self::read_json(collection, response).await?;
        Ok(())
    }
}

/// Logs every mutation instead of sending it and hands out placeholder ids:
/// the application is always 1, pages and blocks count up from 1.
#[derive(Debug, Default)]
pub struct DryRunApi {
    pages: AtomicI64,
    blocks: AtomicI64,
    other: AtomicI64,
}

impl DryRunApi {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentApi for DryRunApi {
    async fn create(&self, collection: Collection, data: &Map<String, Value>) -> Result<CreateOutcome, PopulateError> {
        let payload = serde_json::to_string_pretty(&json!({ "data": data })).unwrap_or_default();
        info!("DRY RUN: would create {} with:\n{}", collection, payload);

        let id = match collection {
            Collection::Applications => 1,
            Collection::Pages => self.pages.fetch_add(1, Ordering::SeqCst) + 1,
            Collection::ContentBlocks => self.blocks.fetch_add(1, Ordering::SeqCst) + 1,
            Collection::ApiTokens => self.other.fetch_add(1, Ordering::SeqCst) + 1,
        };
        Ok(CreateOutcome::Created(id))
    }

    async fn find_id(&self, _collection: Collection, _filters: &[(&str, String)]) -> Result<Option<i64>, PopulateError> {
        Ok(None)
    }

    async fn publish(&self, collection: Collection, id: i64) -> Result<(), PopulateError> {
        info!("DRY RUN: would publish {} {}", collection, id);
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_ids_count_per_collection() {
        let api = DryRunApi::new();
        let data = Map::new();
        assert_eq!(api.create(Collection::Applications, &data).await.unwrap(), CreateOutcome::Created(1));
        assert_eq!(api.create(Collection::Pages, &data).await.unwrap(), CreateOutcome::Created(1));
        assert_eq!(api.create(Collection::Pages, &data).await.unwrap(), CreateOutcome::Created(2));
        assert_eq!(api.create(Collection::ContentBlocks, &data).await.unwrap(), CreateOutcome::Created(1));
        assert_eq!(api.find_id(Collection::Pages, &[]).await.unwrap(), None);
    }

    #[test]
    fn endpoints_replace_the_base_path() {
        let api = HttpApi::new("http://localhost:1337/admin/", "t", Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.endpoint("/api/pages").unwrap().as_str(),
            "http://localhost:1337/api/pages"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpApi::new("not a url", "t", Duration::from_secs(1)),
            Err(PopulateError::InvalidUrl(_))
        ));
    }
}
