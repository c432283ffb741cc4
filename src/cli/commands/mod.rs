//! CLI command implementations

pub mod clear;
pub mod config;
pub mod invalidate;
pub mod show;

pub use clear::execute as clear;
pub use config::execute as config;
pub use invalidate::execute as invalidate;
pub use show::execute as show;

use crate::cache::{CacheFile, CacheState};
use crate::config::Config;
use crate::error::{ModcacheError, ModcacheResult};
use std::path::{Path, PathBuf};

/// The cache file to operate on: the flag, else `cache.file` from config
pub fn resolve_cache_file(flag: Option<PathBuf>, config: &Config) -> ModcacheResult<PathBuf> {
    flag.or_else(|| config.cache.file.clone())
        .ok_or(ModcacheError::NoCacheFile)
}

/// Read an existing cache file, surfacing parse errors
///
/// Builds tolerate a corrupt cache by starting cold; the CLI reports it.
async fn read_existing(path: &Path) -> ModcacheResult<CacheState> {
    if !path.exists() {
        return Err(ModcacheError::CacheFileMissing(path.to_path_buf()));
    }
    CacheFile::new(path).read().await
}
