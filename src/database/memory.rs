use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::document::{check_required, prepare_data, unique_key, Document};
use super::error::{StoreError, StoreResult};
use super::store::ContentStore;
use crate::filter::matcher::{scalar_text, sort_records};
use crate::filter::{FilterMatcher, FindQuery, RelationResolver, Status};
use crate::models::Collection;

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<Collection, BTreeMap<i64, Document>>,
    next_id: HashMap<Collection, i64>,
}

impl MemoryState {
    fn collection(&self, collection: Collection) -> impl Iterator<Item = &Document> + '_ {
        self.documents.get(&collection).into_iter().flat_map(|docs| docs.values())
    }

    fn get(&self, collection: Collection, id: i64) -> Option<&Document> {
        self.documents.get(&collection)?.get(&id)
    }

    fn allocate_id(&mut self, collection: Collection) -> i64 {
        let next = self.next_id.entry(collection).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn check_unique(&self, collection: Collection, data: &Map<String, Value>, exclude: Option<i64>) -> StoreResult<()> {
        let Some(key) = unique_key(collection, data) else {
            return Ok(());
        };
        let clash = self
            .collection(collection)
            .filter(|doc| Some(doc.id) != exclude)
            .any(|doc| doc.unique_key().as_ref() == Some(&key));
        if clash {
            return Err(StoreError::conflict(collection));
        }
        Ok(())
    }

    fn check_relations(&self, collection: Collection, data: &Map<String, Value>) -> StoreResult<()> {
        for field in collection.relation_fields() {
            let (Some(id), Some(target)) = (data.get(*field).and_then(Value::as_i64), collection.relation_target(field))
            else {
                continue;
            };
            if self.get(target, id).is_none() {
                return Err(StoreError::InvalidDocument(format!(
                    "'{}' references missing {} {}",
                    field, target, id
                )));
            }
        }
        Ok(())
    }

    fn select(&self, collection: Collection, query: &FindQuery) -> Vec<Map<String, Value>> {
        let matcher = FilterMatcher::new(self);
        let mut rows: Vec<Map<String, Value>> = self
            .collection(collection)
            .filter_map(|doc| doc.to_json(query.status))
            .filter(|row| matcher.matches(&query.filters, collection, row))
            .collect();
        sort_records(&mut rows, &query.sort);
        rows
    }
}

impl RelationResolver for MemoryState {
    fn load(&self, collection: Collection, id: &Value) -> Option<Map<String, Value>> {
        let id = scalar_text(id)?.parse::<i64>().ok()?;
        self.get(collection, id)?.to_json(Status::Draft)
    }
}

/// In-process store used by tests, dry runs and `CMS_STORE=memory`
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find(&self, collection: Collection, query: &FindQuery) -> StoreResult<Vec<Map<String, Value>>> {
        let state = self.state.read().await;
        let rows = state.select(collection, query).into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn count(&self, collection: Collection, query: &FindQuery) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.select(collection, query).len() as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: i64) -> StoreResult<Option<Document>> {
        let state = self.state.read().await;
        Ok(state.get(collection, id).cloned())
    }

    async fn create(&self, collection: Collection, data: Map<String, Value>) -> StoreResult<Document> {
        let data = prepare_data(collection, data)?;
        check_required(collection, &data)?;

        let mut state = self.state.write().await;
        state.check_relations(collection, &data)?;
        state.check_unique(collection, &data, None)?;

        let id = state.allocate_id(collection);
        let document = Document::new(id, collection, data, Utc::now());
        state
            .documents
            .entry(collection)
            .or_default()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn update(&self, collection: Collection, id: i64, patch: Map<String, Value>) -> StoreResult<Document> {
        let patch = prepare_data(collection, patch)?;

        let mut state = self.state.write().await;
        let mut document = state
            .get(collection, id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        document.apply_update(patch, Utc::now())?;
        state.check_relations(collection, &document.draft)?;
        state.check_unique(collection, &document.draft, Some(id))?;

        state
            .documents
            .entry(collection)
            .or_default()
            .insert(id, document.clone());
        Ok(document)
    }

    async fn publish(&self, collection: Collection, id: i64) -> StoreResult<Document> {
        let mut state = self.state.write().await;
        let document = state
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(&id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        document.publish(Utc::now())?;
        Ok(document.clone())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}
