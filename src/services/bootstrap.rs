use serde_json::{Map, Value};
use tracing::info;

use crate::database::{ContentStore, StoreResult};
use crate::filter::{FindQuery, Status};
use crate::models::application::generate_api_key;
use crate::models::Collection;

/// Gives every application without an `apiKey` a freshly generated one.
/// Returns the ids that were updated.
pub async fn backfill_api_keys(store: &dyn ContentStore) -> StoreResult<Vec<i64>> {
    let applications = store
        .find(Collection::Applications, &FindQuery::new(Status::Draft))
        .await?;

    let mut updated = Vec::new();
    for application in applications {
        let has_key = application
            .get("apiKey")
            .and_then(Value::as_str)
            .map(|k| !k.is_empty())
            .unwrap_or(false);
        if has_key {
            continue;
        }
        let Some(id) = application.get("id").and_then(Value::as_i64) else {
            continue;
        };

        let mut patch = Map::new();
        patch.insert("apiKey".into(), Value::String(generate_api_key()));
        store.update(Collection::Applications, id, patch).await?;
        updated.push(id);
    }

    if !updated.is_empty() {
        info!("Generated API keys for {} application(s)", updated.len());
    }
    Ok(updated)
}
