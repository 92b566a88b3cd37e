//! fitlog: per-user exercise log HTTP service.
//!
//! Usage:
//!   fitlog [--port 3000] [--config path.toml] [--data path.json] [--ephemeral]
//!
//! Environment variables:
//!   PORT        - Port to listen on (default: 3000)
//!   FITLOG_DATA - Path of the persisted user collection (default: ~/.fitlog/users.json)

use anyhow::Result;
use clap::Parser;
use fitlog::config::Config;
use fitlog::store::UserStore;
use fitlog::{server, Args};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration, then apply command-line overrides
    let mut cfg = if let Some(path) = &args.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(data) = &args.data {
        cfg.data_path = Some(data.clone());
    }
    if args.ephemeral {
        cfg.data_path = None;
    }

    // One store handle for the process lifetime; no implicit global.
    let store = match &cfg.data_path {
        Some(path) => {
            tracing::info!("persisting users at {}", path.display());
            UserStore::open(path.clone())?
        }
        None => UserStore::in_memory(),
    };

    server::run(cfg, Arc::new(store)).await
}
