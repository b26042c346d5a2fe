//! Folio ingest binary entry point.
//!
//! Starts the webhook receiver and the read API over the configured store.

use anyhow::{Context, Result};
use clap::Parser;
use folio_ingest::infrastructure::config::SECRET_ENV_VAR;
use folio_ingest::{FolioConfig, IngestNode};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Folio ingest CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "folio-ingest")]
#[command(about = "Folio - publish posts and projects from repository notifications")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP API listen address (overrides the config file).
    #[arg(short = 'l', long)]
    listen: Option<SocketAddr>,

    /// Data directory for persistence (overrides the config file).
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {:?}", path);
            FolioConfig::from_file(path).context("Failed to load configuration")?
        }
        None => FolioConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(data_dir) = args.data_dir {
        config.server.data_dir = data_dir;
    }
    config.apply_env();
    if config.webhook.secret.is_empty() {
        tracing::error!("No webhook secret configured; set {}", SECRET_ENV_VAR);
    }

    tracing::info!("Data directory: {:?}", config.server.data_dir);
    tracing::info!("HTTP listen address: {}", config.server.listen);

    let node = IngestNode::new(config)
        .await
        .context("Failed to create ingest node")?;

    // Run the node (this blocks until Ctrl-C)
    node.run().await?;

    Ok(())
}
