use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::ContentStore;
use crate::maintenance::count_documents;

pub async fn handle(store: &dyn ContentStore, output_format: OutputFormat) -> anyhow::Result<()> {
    let counts = count_documents(store).await?;

    let rows = counts
        .iter()
        .map(|c| vec![c.collection.clone(), c.drafts.to_string(), c.published.to_string()])
        .collect();
    output_table(
        &output_format,
        "counts",
        &["COLLECTION", "DRAFTS", "PUBLISHED"],
        rows,
        json!(counts),
    )
}
