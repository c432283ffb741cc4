//! Configuration schema for modcache
//!
//! Configuration is stored at `~/.config/modcache/config.toml`

use crate::options::{
    EngineOptions, DEFAULT_CONCURRENCY, DEFAULT_ISOLATION_DIR, DEFAULT_MANIFEST_NAME,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache engine settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl GeneralConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Cache engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file used when no --cache-file is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Maximum concurrent stat calls per invalidation pass
    pub concurrency: usize,

    /// File name that marks a package root
    pub manifest_name: String,

    /// Directory whose packages are assumed not to change
    pub isolation_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: None,
            concurrency: DEFAULT_CONCURRENCY,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            isolation_dir: DEFAULT_ISOLATION_DIR.to_string(),
        }
    }
}

impl CacheConfig {
    /// Engine options for this configuration
    pub fn to_engine_options(&self) -> EngineOptions {
        EngineOptions {
            concurrency: self.concurrency,
            manifest_name: self.manifest_name.clone(),
            isolation_dir: self.isolation_dir.clone(),
        }
    }
}
