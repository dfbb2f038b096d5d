use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::error::MaintenanceResult;
use crate::database::{find_records, ContentStore};
use crate::filter::{FilterOrderInfo, FindQuery, Status};
use crate::models::application::generate_api_key;
use crate::models::{Application, Collection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyIssue {
    Missing,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyChange {
    pub application_id: i64,
    pub domain: String,
    pub issue: KeyIssue,
}

/// Regenerates the `apiKey` of every application whose key is missing or
/// already held by an application with a lower id.
pub async fn dedup_api_keys(store: &dyn ContentStore) -> MaintenanceResult<Vec<KeyChange>> {
    let query = FindQuery::new(Status::Draft).sort_by(FilterOrderInfo::asc("id"));
    let applications = find_records::<Application>(store, Collection::Applications, &query).await?;

    let mut held: HashSet<String> = HashSet::new();
    let mut changes = Vec::new();
    for app in applications {
        let issue = match app.attributes.api_key.as_deref() {
            Some(key) if !key.is_empty() && held.insert(key.to_string()) => continue,
            Some(key) if !key.is_empty() => KeyIssue::Duplicate,
            _ => KeyIssue::Missing,
        };

        let mut key = generate_api_key();
        while held.contains(&key) {
            key = generate_api_key();
        }
        held.insert(key.clone());

        let mut patch = Map::new();
        patch.insert("apiKey".into(), Value::String(key));
        store.update(Collection::Applications, app.id, patch).await?;
        changes.push(KeyChange {
            application_id: app.id,
            domain: app.attributes.domain,
            issue,
        });
    }

    info!("Regenerated {} API key(s)", changes.len());
    Ok(changes)
}
