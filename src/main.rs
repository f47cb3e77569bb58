//! Glucolog server binary
//!
//! Boots the sample store and the HTTP API. Configuration comes from an
//! optional TOML file, `GLUCOLOG_*` environment variables, and CLI
//! flags, in increasing precedence.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glucolog::api::{serve, AppState};
use glucolog::config::Config;
use glucolog::store::Store;

#[derive(Debug, Parser)]
#[command(name = "glucolog", version, about = "Physiological time-series ingestion and analytics")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the database path
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.store.db_path = db_path;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting glucolog v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("database: {}", config.store.db_path.display());

    let store = Store::open(&config.store.db_path).context("opening sample store")?;
    let state = AppState::new(store, config.api.clone());

    serve(state).await.context("running API server")?;

    Ok(())
}
