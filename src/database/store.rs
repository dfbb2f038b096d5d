use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::document::Document;
use super::error::{StoreError, StoreResult};
use crate::filter::{FindQuery, Status};
use crate::models::{Collection, Record};

/// Persistence seam for every collection.
///
/// Reads return flattened records of the requested variant; writes always
/// operate on the draft and return the full [`Document`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &FindQuery) -> StoreResult<Vec<Map<String, Value>>>;

    async fn count(&self, collection: Collection, query: &FindQuery) -> StoreResult<u64>;

    async fn find_by_id(&self, collection: Collection, id: i64) -> StoreResult<Option<Document>>;

    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Document>;

    async fn update(&self, collection: Collection, id: i64, patch: Map<String, Value>) -> StoreResult<Document>;

    async fn publish(&self, collection: Collection, id: i64) -> StoreResult<Document>;

    async fn health_check(&self) -> StoreResult<()>;

    async fn close(&self);
}

pub type SharedStore = Arc<dyn ContentStore>;

/// Finds and decodes records into their typed attributes
pub async fn find_records<T: DeserializeOwned>(
    store: &dyn ContentStore,
    collection: Collection,
    query: &FindQuery,
) -> StoreResult<Vec<Record<T>>> {
    store
        .find(collection, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(StoreError::from))
        .collect()
}

/// Verifies that every relation in `data` points at an existing document
pub async fn check_relations(
    store: &dyn ContentStore,
    collection: Collection,
    data: &Map<String, Value>,
) -> StoreResult<()> {
    for field in collection.relation_fields() {
        let Some(id) = data.get(*field).and_then(Value::as_i64) else {
            continue;
        };
        let Some(target) = collection.relation_target(field) else {
            continue;
        };
        if store.find_by_id(target, id).await?.is_none() {
            return Err(StoreError::InvalidDocument(format!(
                "'{}' references missing {} {}",
                field, target, id
            )));
        }
    }
    Ok(())
}

/// Number of drafts in a collection
pub async fn count_all(store: &dyn ContentStore, collection: Collection) -> StoreResult<u64> {
    store.count(collection, &FindQuery::new(Status::Draft)).await
}
