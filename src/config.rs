//! Store configuration.

use crate::model::DEFAULT_TICKS_PER_QUARTER;
use crate::persistence::SaveFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings applied to a store and the projects it creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum undo (and redo) depth per project. `None` keeps everything.
    pub history_limit: Option<usize>,

    /// Resolution of songs in newly created projects.
    pub ticks_per_quarter: u64,

    /// Name of the pattern every new project starts with.
    pub default_pattern_name: String,

    /// Format used when a save path has no recognizable extension.
    pub save_format: SaveFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            default_pattern_name: "Pattern 1".to_string(),
            save_format: SaveFormat::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

impl StoreConfig {
    /// Loads a configuration from a JSON file. Missing keys take their
    /// defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no project could be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_quarter == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_quarter must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
