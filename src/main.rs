//! driftwatch - Main Entry Point
//!
//! Drift monitoring for deployed prediction services.

use clap::Parser;
use driftwatch::cli::{cmd_baseline, cmd_monitor, cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftwatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor(args) => cmd_monitor(args).await?,
        Commands::Baseline(args) => cmd_baseline(args).await?,
        Commands::Serve(args) => cmd_serve(args).await?,
    }

    Ok(())
}
