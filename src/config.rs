//! Application configuration, read from a TOML file.
//!
//! Every section is optional; missing keys take their defaults.
//!
//! ```toml
//! [annealing]
//! initial_temperature = 100.0
//! min_temperature = 0.1
//! iterations_per_temperature = 10
//! progress_interval = 50
//! seed = 42
//!
//! [annealing.cooling]
//! kind = "geometric"
//! alpha = 0.95
//!
//! [cost]
//! deadline_weight = 5.0
//! difficulty_weight = 2.5
//!
//! [search]
//! initial_order = "input"
//! neighbor_move = "swap"
//!
//! [stream]
//! capacity = 256
//! backpressure = "block"
//!
//! [server]
//! bind = "127.0.0.1:3001"
//!
//! [store]
//! path = "tasks_history.json"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ordering::{CostModel, SearchConfig};
use crate::run::{RunSettings, StreamConfig};
use crate::sa::SaConfig;

pub const DEFAULT_CONFIG_FILE: &str = "u-taskorder.toml";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("[annealing] {0}")]
    Annealing(String),
    #[error("[cost] {0}")]
    Cost(String),
    #[error("[stream] {0}")]
    Stream(String),
    #[error("[server] invalid bind address {0:?}")]
    Bind(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// JSON file holding the task list.
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tasks_history.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub annealing: SaConfig,
    pub cost: CostModel,
    pub search: SearchConfig,
    pub stream: StreamConfig,
    pub server: ServerSection,
    pub store: StoreSection,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.annealing.validate().map_err(ConfigError::Annealing)?;
        self.cost.validate().map_err(ConfigError::Cost)?;
        self.stream.validate().map_err(ConfigError::Stream)?;
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.server.bind.clone()))
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            annealing: self.annealing.clone(),
            cost: self.cost,
            search: self.search,
            stream: self.stream,
        }
    }
}

/// Reads and validates `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Writes the default configuration unless `path` already exists.
///
/// Returns whether a file was written.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(path, &AppConfig::default())?;
    Ok(true)
}
