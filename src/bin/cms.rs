use clap::Parser;
use tracing_subscriber::EnvFilter;

use cms_api_rust::cli::utils::output_error;
use cms_api_rust::cli::{Cli, OutputFormat};
use cms_api_rust::config::config;
use cms_api_rust::database::DatabaseManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    let store = match DatabaseManager::open_store(&config().database).await {
        Ok(store) => store,
        Err(e) => {
            output_error(&output_format, &e.to_string(), Some("STORE_UNAVAILABLE"))?;
            std::process::exit(1);
        }
    };

    let result = cms_api_rust::cli::run(cli, store.as_ref()).await;
    store.close().await;

    if let Err(e) = result {
        let message = match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => format!("{e:?}"),
            _ => format!("{e}"),
        };
        output_error(&output_format, &message, None)?;
        std::process::exit(1);
    }

    Ok(())
}
