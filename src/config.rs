//! Engine configuration loaded from TOML

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::grid::GridConfig;
use crate::select::{SelectionWeights, DEFAULT_MAX};
use crate::store::DEDUPE_WINDOW_SECS;
use crate::undo::DEFAULT_UNDO_CAPACITY;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    pub capacity: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_UNDO_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub max: usize,
    #[serde(flatten)]
    pub weights: SelectionWeights,
    pub mobile_only: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX,
            weights: SelectionWeights::default(),
            mobile_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    /// Root directory for documents, undo history and snapshots
    pub data_dir: PathBuf,

    /// Window in which an identical add request counts as a double submit
    pub dedupe_window_secs: i64,

    pub grid: GridConfig,
    pub undo: UndoConfig,
    pub selection: SelectionConfig,
    pub cache: CacheConfig,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dedupe_window_secs: DEDUPE_WINDOW_SECS,
            grid: GridConfig::default(),
            undo: UndoConfig::default(),
            selection: SelectionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl HomeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string; missing keys take defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_undo_capacity(mut self, capacity: usize) -> Self {
        self.undo.capacity = capacity;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache.capacity = capacity;
        self
    }

    pub fn with_dedupe_window_secs(mut self, secs: i64) -> Self {
        self.dedupe_window_secs = secs;
        self
    }
}
