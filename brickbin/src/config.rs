//! Configuration loading and data folder resolution
//!
//! Resolution priority for every value: command line (handled by the caller)
//! → environment variable → TOML config file → compiled default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overrides
const ENV_REBRICKABLE_KEY: &str = "BRICKBIN_REBRICKABLE_KEY";
const ENV_DATABASE: &str = "BRICKBIN_DATABASE";
const ENV_FETCH_WIDTH: &str = "BRICKBIN_FETCH_WIDTH";

/// Default width of the enrichment worker pool. Network latency dominates,
/// so this bounds outbound connections rather than CPU.
const DEFAULT_FETCH_WIDTH: usize = 10;

/// Application configuration, deserialized from TOML with env overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rebrickable API key; set resolution is disabled without one
    pub rebrickable_key: Option<String>,
    /// Metadata cache location (defaults to the platform data dir)
    pub database: Option<PathBuf>,
    /// Enrichment worker pool width
    pub fetch_width: Option<usize>,
    /// Where a resolved set inventory is materialized before JSON decode
    pub work_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the given TOML file (or the platform default
    /// location), then apply environment overrides. A missing file is not an
    /// error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let content = std::fs::read_to_string(p)?;
                let config: Config = toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("Parse {} failed: {}", p.display(), e)))?;
                debug!("Loaded config from {}", p.display());
                config
            }
            _ => Config::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides on top of the TOML values.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ENV_REBRICKABLE_KEY) {
            if !key.trim().is_empty() {
                self.rebrickable_key = Some(key);
            }
        }
        if let Ok(path) = std::env::var(ENV_DATABASE) {
            if !path.trim().is_empty() {
                self.database = Some(PathBuf::from(path));
            }
        }
        if let Ok(width) = std::env::var(ENV_FETCH_WIDTH) {
            match width.parse::<usize>() {
                Ok(w) if w > 0 => self.fetch_width = Some(w),
                _ => warn!("Ignoring invalid {}: {:?}", ENV_FETCH_WIDTH, width),
            }
        }
    }

    /// Rebrickable API key, if configured and non-empty.
    pub fn rebrickable_key(&self) -> Option<&str> {
        self.rebrickable_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Metadata cache path.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| default_data_dir().join("parts.sqlite"))
    }

    /// Path where a resolved set inventory is written for the JSON adapter.
    pub fn work_file_path(&self) -> PathBuf {
        self.work_file
            .clone()
            .unwrap_or_else(|| default_data_dir().join("set_inventory.json"))
    }

    /// Enrichment worker pool width.
    pub fn fetch_width(&self) -> usize {
        match self.fetch_width {
            Some(w) if w > 0 => w,
            _ => DEFAULT_FETCH_WIDTH,
        }
    }
}

/// Default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("brickbin").join("config.toml"))
}

/// Default data folder for the cache and working files
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("brickbin"))
        .unwrap_or_else(|| PathBuf::from("./brickbin_data"))
}
