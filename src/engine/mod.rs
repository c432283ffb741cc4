//! The build cache engine
//!
//! [`BuildCache`] owns one [`CacheState`] for the lifetime of a host process
//! and exposes the per-build cycle:
//!
//! 1. [`BuildCache::invalidate_before_build`] prunes stale entries
//! 2. [`BuildCache::module_cache`] and [`BuildCache::package_cache`] seed
//!    dependency resolution
//! 3. the host reports what it resolved through the discovery operations
//! 4. [`BuildCache::persist_when_drained`] writes the cache back
//!
//! Builds against one engine must not overlap; every mutating operation
//! takes `&mut self`, so the borrow checker enforces that for a single owner.

mod discovery;

pub use discovery::DiscoveredModule;

use crate::cache::{CacheEvent, CacheFile, CacheState, EventSink, ModuleRecord, PackageManifest};
use crate::error::ModcacheResult;
use crate::fs::Filesystem;
use crate::invalidate::{InvalidationReport, Invalidator};
use crate::options::EngineOptions;
use crate::writes::WriteTracker;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Incremental build cache bound to a filesystem
pub struct BuildCache {
    state: CacheState,
    fs: Arc<dyn Filesystem>,
    options: EngineOptions,
    writes: WriteTracker,
    events: EventSink,
    cache_file: Option<CacheFile>,
}

impl BuildCache {
    /// Wrap an existing state
    ///
    /// Fails if `options` cannot drive invalidation.
    pub fn new(
        state: CacheState,
        fs: Arc<dyn Filesystem>,
        options: EngineOptions,
    ) -> ModcacheResult<Self> {
        options.validate()?;
        Ok(Self {
            state,
            fs,
            options,
            writes: WriteTracker::new(),
            events: EventSink::none(),
            cache_file: None,
        })
    }

    /// Load the cache stored at `path`, starting cold if it is unreadable
    pub async fn open(
        path: impl Into<PathBuf>,
        fs: Arc<dyn Filesystem>,
        options: EngineOptions,
        events: EventSink,
    ) -> ModcacheResult<Self> {
        options.validate()?;
        let cache_file = CacheFile::new(path);
        let state = cache_file.load(&events).await;
        Ok(Self {
            state,
            fs,
            options,
            writes: WriteTracker::new(),
            events,
            cache_file: Some(cache_file),
        })
    }

    /// Send lifecycle events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Persist to `path` on [`BuildCache::persist`]
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(CacheFile::new(path));
        self
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_ref().map(CacheFile::path)
    }

    /// Handle the host uses to report in-flight writes and streamed sources
    pub fn writes(&self) -> &WriteTracker {
        &self.writes
    }

    /// Prune everything that changed since the last build
    ///
    /// Always completes; per-path failures are classified, never raised.
    pub async fn invalidate_before_build(&mut self) -> InvalidationReport {
        let report = Invalidator::new(self.fs.as_ref(), &self.options, &self.writes)
            .run(&mut self.state)
            .await;

        // Streamed sources were only needed to settle this pass
        self.writes.clear_streamed();

        if report.is_empty() {
            debug!("Cache is current");
        } else {
            info!(
                "Invalidated {} and deleted {} cached path(s)",
                report.invalidated.len(),
                report.deleted.len()
            );
        }
        self.events.emit(CacheEvent::ChangedDeps {
            invalidated: report.invalidated.iter().cloned().collect(),
            deleted: report.deleted.iter().cloned().collect(),
        });
        report
    }

    /// Cached module records to seed dependency resolution with
    pub fn module_cache(&self) -> &BTreeMap<PathBuf, ModuleRecord> {
        &self.state.modules
    }

    /// File -> governing manifest, rebuilt from the package store
    ///
    /// Files whose root has no cached manifest are left out.
    pub fn package_cache(&self) -> BTreeMap<&Path, &PackageManifest> {
        self.state
            .files_package_paths
            .keys()
            .filter_map(|file| Some((file.as_path(), self.state.package_for_file(file)?)))
            .collect()
    }

    /// Write the cache file, reporting failure as an event
    ///
    /// Returns whether the file was written.
    pub async fn persist(&self) -> bool {
        let Some(cache_file) = &self.cache_file else {
            debug!("No cache file configured, skipping persist");
            return false;
        };
        cache_file.store_reporting(&self.state, &self.events).await
    }

    /// Wait for the host's pending writes, then persist
    pub async fn persist_when_drained(&self) -> bool {
        self.writes.wait_drained().await;
        self.persist().await
    }
}
