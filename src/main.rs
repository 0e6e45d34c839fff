//! Main entry point for the xenocanto-downloader CLI.

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use xenocanto_downloader::cli::{Cli, Commands};

/// Initialize tracing subscriber with optional JSON formatting.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("xenocanto_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch(ref args) => args.execute().await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Download(ref args) => args.execute().await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Reconcile(ref args) => args.execute().map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
