use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::ContentStore;
use crate::maintenance::create_token;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Create a write token; the secret is shown only once")]
    Create {
        #[arg(help = "Token name")]
        name: String,
        #[arg(long, default_value = "", help = "Free-form description")]
        description: String,
    },
}

pub async fn handle(cmd: TokenCommands, store: &dyn ContentStore, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Create { name, description } => {
            let issued = create_token(store, &name, &description).await?;

            if let OutputFormat::Text = output_format {
                println!("{}", issued.secret);
            }
            output_success(
                &output_format,
                &format!("Created API token '{}' ({}); store the secret now, it cannot be shown again", issued.name, issued.id),
                Some(json!({ "token": issued })),
            )
        }
    }
}
