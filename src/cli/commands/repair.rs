use std::path::Path;

use anyhow::Context;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::ContentStore;
use crate::maintenance::{dedup_api_keys, parse_mapping, repair_relations, KeyIssue};

/// `cms repair-relations <mapping.json>`
pub async fn relations(mapping_file: &Path, store: &dyn ContentStore, output_format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(mapping_file)
        .with_context(|| format!("Failed to read mapping file {}", mapping_file.display()))?;
    let mapping = parse_mapping(&text)?;

    let report = repair_relations(store, &mapping).await?;
    output_success(
        &output_format,
        &format!(
            "Linked {} block(s) and published {} page(s)",
            report.blocks_updated,
            report.pages_published.len()
        ),
        Some(json!(report)),
    )
}

/// `cms dedup-api-keys`
pub async fn api_keys(store: &dyn ContentStore, output_format: OutputFormat) -> anyhow::Result<()> {
    let changes = dedup_api_keys(store).await?;

    if let OutputFormat::Text = output_format {
        for change in &changes {
            let reason = match change.issue {
                KeyIssue::Missing => "missing",
                KeyIssue::Duplicate => "duplicate",
            };
            println!("  application {} ({}): {} key regenerated", change.application_id, change.domain, reason);
        }
    }
    output_success(
        &output_format,
        &format!("Regenerated {} API key(s)", changes.len()),
        Some(json!({ "changes": changes })),
    )
}
