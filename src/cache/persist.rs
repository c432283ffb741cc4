//! Cache file persistence
//!
//! The cache is a single JSON object with the keys `modules`, `packages`,
//! `mtimes`, `filesPackagePaths` and `dependentFiles`. Loading is fail-safe:
//! a missing or corrupt file yields an empty cache (cold start). Storing is
//! best-effort: a failed write costs future build speed, never correctness.

use crate::cache::events::{CacheEvent, EventSink};
use crate::cache::CacheState;
use crate::error::{ModcacheError, ModcacheResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// A cache file on disk
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Refer to the cache file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file, surfacing any failure
    pub async fn read(&self) -> ModcacheResult<CacheState> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            ModcacheError::io(format!("reading cache file {}", self.path.display()), e)
        })?;

        serde_json::from_str(&content).map_err(|e| ModcacheError::CacheFileParse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Load the cache, falling back to an empty one on any failure
    pub async fn load(&self, events: &EventSink) -> CacheState {
        match self.read().await {
            Ok(state) => {
                debug!(
                    "Loaded cache from {} ({} modules, {} packages)",
                    self.path.display(),
                    state.modules.len(),
                    state.packages.len()
                );
                state
            }
            Err(e) => {
                if is_not_found(&e) {
                    debug!("No cache file at {}, starting cold", self.path.display());
                } else {
                    warn!("Ignoring unreadable cache file: {}", e);
                }
                events.emit(CacheEvent::CacheFileReadError {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                CacheState::new()
            }
        }
    }

    /// Serialize `state` to the file, creating parent directories
    pub async fn store(&self, state: &CacheState) -> ModcacheResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                ModcacheError::io(format!("creating cache directory {}", parent.display()), e)
            })?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await.map_err(|e| {
            ModcacheError::io(format!("writing cache file {}", self.path.display()), e)
        })
    }

    /// Store and report the outcome as an event instead of an error
    pub async fn store_reporting(&self, state: &CacheState, events: &EventSink) -> bool {
        match self.store(state).await {
            Ok(()) => {
                info!("Cache written to {}", self.path.display());
                events.emit(CacheEvent::CacheFileWritten(self.path.clone()));
                true
            }
            Err(e) => {
                warn!("Failed to write cache: {}", e);
                events.emit(CacheEvent::CacheFileWriteError {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Delete the file, returning whether it existed
    pub async fn remove(&self) -> ModcacheResult<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ModcacheError::io(
                format!("deleting cache file {}", self.path.display()),
                e,
            )),
        }
    }
}

fn is_not_found(err: &ModcacheError) -> bool {
    matches!(err, ModcacheError::Io { source, .. } if source.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ModuleRecord, Timestamp};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn store_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let file = CacheFile::new(dir.path().join("cache.json"));

        let mut state = CacheState::new();
        state.insert_module(
            PathBuf::from("/p/a.js"),
            ModuleRecord::new("/p/a.js", "module.exports = 1"),
        );
        state
            .mtimes
            .insert(PathBuf::from("/p/a.js"), Timestamp::from_millis(10));
        state.add_dependent("/p/a.txt".into(), "/p/a.js".into());

        file.store(&state).await.unwrap();
        let loaded = file.load(&EventSink::none()).await;

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn load_missing_file_is_cold_start() {
        let dir = TempDir::new().unwrap();
        let file = CacheFile::new(dir.path().join("missing.json"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let state = file.load(&EventSink::channel(tx)).await;

        assert!(state.is_empty());
        assert!(matches!(
            rx.try_recv().unwrap(),
            CacheEvent::CacheFileReadError { .. }
        ));
    }

    #[tokio::test]
    async fn load_corrupt_file_is_cold_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not valid json {{{").unwrap();

        let file = CacheFile::new(&path);
        assert!(matches!(
            file.read().await,
            Err(ModcacheError::CacheFileParse { .. })
        ));
        assert!(file.load(&EventSink::none()).await.is_empty());
    }

    #[tokio::test]
    async fn load_partial_file_fills_missing_maps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"mtimes": {"/p/a.js": 3}, "extra": [1, 2]}"#).unwrap();

        let state = CacheFile::new(&path).load(&EventSink::none()).await;
        assert_eq!(state.mtimes.len(), 1);
        assert!(state.modules.is_empty());
        assert!(state.files_package_paths.is_empty());
        assert_eq!(state.extra["extra"], serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn store_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deeply").join("nested").join("cache.json");

        CacheFile::new(&path).store(&CacheState::new()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the write fail
        let path = dir.path().join("cache.json");
        std::fs::create_dir(&path).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let written = CacheFile::new(&path)
            .store_reporting(&CacheState::new(), &EventSink::channel(tx))
            .await;

        assert!(!written);
        assert!(matches!(
            rx.try_recv().unwrap(),
            CacheEvent::CacheFileWriteError { .. }
        ));
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let dir = TempDir::new().unwrap();
        let file = CacheFile::new(dir.path().join("cache.json"));
        assert!(!file.remove().await.unwrap());

        file.store(&CacheState::new()).await.unwrap();
        assert!(file.remove().await.unwrap());
    }
}
