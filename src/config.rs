// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use crate::error::{Result, StoreError};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Full-store scan tuning (optional).
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Where records live and how JSON payloads are read back.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory holding the 2-hex shard directories.
    pub base_path: PathBuf,
    /// Turn ISO-8601 looking strings in JSON payloads into dates on read.
    #[serde(default = "default_revive_dates")]
    pub revive_dates: bool,
}

/// Parameters for `Store::each` / `Store::entries`.
#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Maximum number of record files read at the same time.
    #[serde(default = "default_scan_concurrency")]
    pub concurrency: usize,
    /// Bounded channel capacity between read workers and the visitor.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Abort the whole scan on the first unreadable or corrupt record.
    /// When false, failures are reported in the scan summary and skipped.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: default_scan_concurrency(),
            channel_capacity: default_channel_capacity(),
            fail_fast: false,
        }
    }
}

fn default_revive_dates() -> bool { true }
fn default_scan_concurrency() -> usize { 16 }
fn default_channel_capacity() -> usize { 64 }

impl Config {
    /// Defaults for a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                base_path: base_path.into(),
                revive_dates: default_revive_dates(),
            },
            scan: ScanConfig::default(),
        }
    }

    /// Load configuration from a TOML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Cannot read config file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| StoreError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.base_path.as_os_str().is_empty() {
            return Err(StoreError::Config("base_path must not be empty".into()));
        }
        if self.scan.concurrency == 0 {
            return Err(StoreError::Config("scan.concurrency must be > 0".into()));
        }
        if self.scan.channel_capacity == 0 {
            return Err(StoreError::Config("scan.channel_capacity must be > 0".into()));
        }
        Ok(())
    }
}
