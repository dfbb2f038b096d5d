use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::ContentStore;
use crate::maintenance::{list_applications, list_pages};

#[derive(Subcommand)]
pub enum ListCommands {
    #[command(about = "List pages with slug, path, state and block count")]
    Pages {
        #[arg(long, help = "Only pages of the application serving this domain")]
        domain: Option<String>,
    },

    #[command(about = "List applications with domain, active flag and API key presence")]
    Applications,
}

pub async fn handle(cmd: ListCommands, store: &dyn ContentStore, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ListCommands::Pages { domain } => {
            let pages = list_pages(store, domain.as_deref()).await?;
            if pages.is_empty() {
                return output_empty_collection(&output_format, "pages", "No pages found");
            }

            let rows = pages
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.application.to_string(),
                        p.title.clone(),
                        p.slug.clone(),
                        p.path.clone(),
                        p.state.to_string(),
                        p.block_count.to_string(),
                    ]
                })
                .collect();
            output_table(
                &output_format,
                "pages",
                &["ID", "APP", "TITLE", "SLUG", "PATH", "STATE", "BLOCKS"],
                rows,
                json!(pages),
            )
        }
        ListCommands::Applications => {
            let applications = list_applications(store).await?;
            if applications.is_empty() {
                return output_empty_collection(&output_format, "applications", "No applications found");
            }

            let rows = applications
                .iter()
                .map(|a| {
                    vec![
                        a.id.to_string(),
                        a.name.clone(),
                        a.domain.clone(),
                        if a.active { "yes" } else { "no" }.to_string(),
                        if a.has_api_key { "yes" } else { "missing" }.to_string(),
                    ]
                })
                .collect();
            output_table(
                &output_format,
                "applications",
                &["ID", "NAME", "DOMAIN", "ACTIVE", "API KEY"],
                rows,
                json!(applications),
            )
        }
    }
}
