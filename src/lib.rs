//! modcache - incremental build cache invalidation
//!
//! Decides which cached module records, package manifests and
//! transform-dependency entries from a previous bundler run are still
//! valid, using file mtimes as the only staleness signal.
//!
//! ```rust,ignore
//! use modcache::{BuildCache, EngineOptions, LocalFs};
//!
//! let mut cache = BuildCache::open(path, Arc::new(LocalFs), EngineOptions::default(), events).await?;
//! let report = cache.invalidate_before_build().await;
//! // resolve with cache.module_cache() / cache.package_cache(), report discoveries
//! cache.persist_when_drained().await;
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod invalidate;
pub mod options;
pub mod ui;
pub mod writes;

pub use engine::{BuildCache, DiscoveredModule};
pub use error::{ModcacheError, ModcacheResult};
pub use fs::{Filesystem, LocalFs};
pub use invalidate::InvalidationReport;
pub use options::EngineOptions;
pub use writes::{WriteGuard, WriteTracker};
