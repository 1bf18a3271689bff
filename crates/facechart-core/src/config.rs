//! Device configuration.
//!
//! Loaded from `<config dir>/facechart/config.json`. Every field has a
//! default, so a partial file only overrides what it names:
//!
//! ```json
//! { "sync": { "endpoint": "https://charts.example.com", "interval_secs": 120 } }
//! ```

use crate::model::ProductCategory;
use crate::storage::DEFAULT_AUTOSAVE_INTERVAL_SECS;
use crate::sync::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SYNC_INTERVAL_SECS};
use crate::tools::DEFAULT_STROKE_WIDTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the sync server. Sync is disabled when empty.
    pub endpoint: String,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory for the pending queue.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartingSettings {
    pub default_product: ProductCategory,
    pub autosave: bool,
    pub autosave_interval_secs: u64,
    pub stroke_width: f64,
}

impl Default for ChartingSettings {
    fn default() -> Self {
        Self {
            default_product: ProductCategory::Neurotoxin,
            autosave: true,
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl ChartingSettings {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// Top-level device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartingConfig {
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub charting: ChartingSettings,
}

impl ChartingConfig {
    /// Path to the user config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("facechart").join("config.json"))
    }

    /// Load from the default path. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Like [`load`](Self::load), but falls back to the defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::warn!("Using default configuration: {}", e);
            Self::default()
        })
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json).map_err(io_err)
    }
}
