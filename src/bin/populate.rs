use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cms_api_rust::config::config;
use cms_api_rust::populate::{ContentApi, DryRunApi, HttpApi, Populator};
use cms_api_rust::seed::parse_seed;

#[derive(Parser)]
#[command(name = "populate")]
#[command(about = "Create a client's application, pages and blocks from a markdown seed file")]
#[command(version)]
struct Args {
    #[arg(help = "Seed markdown file")]
    markdown_file: PathBuf,

    #[arg(help = "API base URL, e.g. http://localhost:1337")]
    api_base_url: String,

    #[arg(help = "Bearer token accepted for writes")]
    api_token: String,

    #[arg(long, help = "Log the payloads instead of sending them")]
    dry_run: bool,

    #[arg(long, help = "Publish the application and each page once its blocks exist")]
    publish: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when some pages failed
async fn run(args: Args) -> anyhow::Result<bool> {
    let text = std::fs::read_to_string(&args.markdown_file)
        .with_context(|| format!("File not found: {}", args.markdown_file.display()))?;
    let doc = parse_seed(&text).with_context(|| format!("Failed to parse {}", args.markdown_file.display()))?;
    tracing::info!(
        "Parsed {} page(s) for {}",
        doc.pages.len(),
        doc.meta("client_name").unwrap_or("unnamed client")
    );

    let api: Box<dyn ContentApi> = if args.dry_run {
        Box::new(DryRunApi::new())
    } else {
        let timeout = Duration::from_secs(config().populator.request_timeout_secs);
        Box::new(HttpApi::new(&args.api_base_url, &args.api_token, timeout)?)
    };

    let report = Populator::new(api.as_ref()).with_publish(args.publish).run(&doc).await?;

    println!("Application: {}", report.application_id);
    for (title, id) in &report.pages {
        println!("  page {:>4}  {}", id, title);
    }
    println!(
        "{} block(s) created, {} reused{}",
        report.blocks_created,
        report.blocks_reused,
        if report.dry_run { " (dry run)" } else { "" }
    );
    for (title, error) in &report.failures {
        eprintln!("Failed page '{}': {}", title, error);
    }
    Ok(report.is_success())
}
