use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use metaproc::{Environment, config, daemon, logging};
use tokio::select;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "metaproc", version, about = "Validate IPFS metadata of indexed entities")]
struct Cli {
    /// Environment preset.
    #[arg(short, long, value_enum, default_value_t = Environment::Staging)]
    env: Environment,

    /// TOML file overriding the preset.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(config::load(cli.env, cli.config.as_deref())?);
    logging::initialize(&config);
    info!(environment = %config.environment, "metaproc starting");

    let shutdown = CancellationToken::new();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
        signal_shutdown.cancel();
    });

    daemon::run(config, shutdown).await
}
