pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::database::ContentStore;

#[derive(Parser)]
#[command(name = "cms")]
#[command(about = "CMS maintenance - inspect and repair stored site content")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Count documents per collection (drafts and published)")]
    Count,

    #[command(about = "List stored records")]
    List {
        #[command(subcommand)]
        cmd: commands::list::ListCommands,
    },

    #[command(about = "Point blocks at pages from a JSON mapping, then publish the pages")]
    RepairRelations {
        #[arg(help = "JSON file of { \"<pageId>\": [blockId, ...] }")]
        mapping: std::path::PathBuf,
    },

    #[command(about = "Regenerate missing or duplicated application API keys")]
    DedupApiKeys,

    #[command(about = "API token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, store: &dyn ContentStore) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Count => commands::count::handle(store, output_format).await,
        Commands::List { cmd } => commands::list::handle(cmd, store, output_format).await,
        Commands::RepairRelations { mapping } => commands::repair::relations(&mapping, store, output_format).await,
        Commands::DedupApiKeys => commands::repair::api_keys(store, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, store, output_format).await,
    }
}
