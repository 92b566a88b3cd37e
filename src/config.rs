//! Service configuration: defaults and an optional TOML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration for the server binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TCP port the HTTP server binds.
    pub port: u16,
    /// Where the user collection is persisted; `None` keeps it in memory.
    pub data_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_path: Some(app_dir().join("users.json")),
        }
    }
}

/// `~/.fitlog`, relative to the current directory when no home dir exists.
fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fitlog")
}

impl Config {
    /// Load `~/.fitlog/config.toml` when present, defaults otherwise.
    pub fn load() -> Result<Self> {
        let path = app_dir().join("config.toml");
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load a specific TOML config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: Config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(cfg)
    }
}
