//! ovation - conference talk-rating service
//!
//! Loads configuration (file, then `OVATION_*` environment variables, then
//! CLI flags), wires the record store, audit log, and rating ledger, and
//! serves the HTTP API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ovation::state::AppState;
use ovation::web;

#[derive(Parser)]
#[command(name = "ovation")]
#[command(about = "Conference talk-rating service")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ovaconf::OvationConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ovaconf::OvationConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(data_dir) = cli.data_dir {
        config.paths.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.bind.port = port;
    }

    tracing::info!(
        data_dir = %config.paths.data_dir.display(),
        log_file = %config.rating_log_file().display(),
        max_rating = config.rating.max_rating,
        "starting ovation"
    );

    let port = config.bind.port;
    let state = AppState::from_config(config).context("initializing data directories")?;
    let app = web::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
