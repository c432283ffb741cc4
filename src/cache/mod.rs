//! Persistent incremental build cache
//!
//! Holds what the previous build learned about modules, packages and
//! transform inputs, keyed by absolute file path. Staleness is decided by
//! mtime alone: there is no content hashing.
//!
//! # Lifecycle
//!
//! | Phase | Writer |
//! |-------|--------|
//! | startup | [`CacheFile::load`] (cold start on failure) |
//! | before build | invalidation passes prune stale entries |
//! | during build | discovery operations record fresh entries |
//! | after build | [`CacheFile::store`] (best-effort) |

pub mod events;
pub mod mtime;
pub mod persist;
pub mod state;

pub use events::{CacheEvent, EventSink};
pub use mtime::MtimeTracker;
pub use persist::CacheFile;
pub use state::{
    files_by_root, manifest_path, CacheState, DepTarget, ModuleRecord, PackageManifest, Timestamp,
};
