//! Configuration for scrollkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, ScrollError};

/// Main configuration for a scrollkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the store
    /// Internal structure:
    ///   {data_dir}/
    ///     └── dump.scdb        (append-only data log)
    pub data_dir: PathBuf,

    /// Sync strategy: how often to fsync the data log
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Search Configuration
    // -------------------------------------------------------------------------
    /// Maintain the prefix-search index. Fixed for the lifetime of an open store.
    pub search_enabled: bool,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./scrollkv_data"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            search_enabled: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ScrollError::Config("data_dir must not be empty".to_string()));
        }

        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(ScrollError::Config(
                "EveryNEntries sync strategy needs a count of at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Enable or disable the prefix-search index
    pub fn search_enabled(mut self, enabled: bool) -> Self {
        self.config.search_enabled = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
