//! Runtime configuration: loads optional ~/.sythm/config.yaml.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{DEFAULT_BPM, DEFAULT_MASTER_VOLUME};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Settings loaded from ~/.sythm/config.yaml. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SythmConfig {
    /// Tempo every run starts at.
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    /// How far ahead of the audio clock notes are handed to the output.
    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Output sample rate; the device default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Seed for the noise voices.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

fn default_master_volume() -> f64 {
    DEFAULT_MASTER_VOLUME
}

fn default_lookahead_ms() -> u64 {
    100
}

fn default_tick_interval_ms() -> u64 {
    25
}

fn default_seed() -> u64 {
    42
}

impl Default for SythmConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            master_volume: default_master_volume(),
            lookahead_ms: default_lookahead_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            sample_rate: None,
            seed: default_seed(),
        }
    }
}

/// Path of the user config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".sythm").join("config.yaml"))
}

impl SythmConfig {
    /// Load ~/.sythm/config.yaml, or the defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(io_err)
    }
}
