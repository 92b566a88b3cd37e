//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

/// Per-user exercise log service.
#[derive(Debug, Parser)]
#[command(name = "fitlog", version, about)]
pub struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to a TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist the user collection at this path.
    #[arg(long, env = "FITLOG_DATA")]
    pub data: Option<PathBuf>,

    /// Keep the user collection in memory only.
    #[arg(long)]
    pub ephemeral: bool,
}
