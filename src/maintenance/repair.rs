use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::error::{MaintenanceError, MaintenanceResult};
use crate::database::{ContentStore, StoreError};
use crate::filter::Status;
use crate::models::{Collection, ContentBlock};

/// Page id to the block ids that belong on it
pub type RelationMapping = BTreeMap<i64, Vec<i64>>;

/// Parses `{ "<pageId>": [blockId, ...] }`
pub fn parse_mapping(text: &str) -> MaintenanceResult<RelationMapping> {
    let raw: Map<String, Value> =
        serde_json::from_str(text).map_err(|e| MaintenanceError::InvalidMapping(e.to_string()))?;

    let mut mapping = RelationMapping::new();
    for (key, value) in raw {
        let page_id = key
            .trim()
            .parse::<i64>()
            .map_err(|_| MaintenanceError::InvalidMapping(format!("'{}' is not a page id", key)))?;
        let blocks = value
            .as_array()
            .ok_or_else(|| MaintenanceError::InvalidMapping(format!("page {} must map to an array", page_id)))?
            .iter()
            .map(|b| {
                b.as_i64()
                    .ok_or_else(|| MaintenanceError::InvalidMapping(format!("page {}: '{}' is not a block id", page_id, b)))
            })
            .collect::<MaintenanceResult<Vec<i64>>>()?;
        mapping.insert(page_id, blocks);
    }
    Ok(mapping)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub blocks_updated: usize,
    /// Listed blocks that already pointed at their page
    pub blocks_unchanged: usize,
    pub pages_published: Vec<i64>,
}

/// Points every listed block at its page, then publishes the page.
/// Stops at the first failure.
pub async fn repair_relations(store: &dyn ContentStore, mapping: &RelationMapping) -> MaintenanceResult<RepairReport> {
    let mut report = RepairReport::default();

    for (&page_id, block_ids) in mapping {
        if store.find_by_id(Collection::Pages, page_id).await?.is_none() {
            return Err(StoreError::not_found(Collection::Pages, page_id).into());
        }

        for &block_id in block_ids {
            let block = store
                .find_by_id(Collection::ContentBlocks, block_id)
                .await?
                .ok_or_else(|| StoreError::not_found(Collection::ContentBlocks, block_id))?;
            let previous = block.decode::<ContentBlock>(Status::Draft)?.map(|b| b.attributes.page);
            if previous == Some(page_id) {
                report.blocks_unchanged += 1;
                continue;
            }

            let mut patch = Map::new();
            patch.insert("page".into(), json!(page_id));
            store.update(Collection::ContentBlocks, block_id, patch).await?;
            debug!("Block {} moved from page {:?} to {}", block_id, previous, page_id);
            report.blocks_updated += 1;
        }

        store.publish(Collection::Pages, page_id).await?;
        info!("Page {}: linked {} block(s) and published", page_id, block_ids.len());
        report.pages_published.push(page_id);
    }
    Ok(report)
}
