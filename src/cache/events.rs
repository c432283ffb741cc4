//! Cache lifecycle events
//!
//! Hosts that want to observe the cache (progress UIs, build servers) attach
//! an unbounded channel. Delivery is fire-and-forget: a dropped receiver
//! never fails a cache operation.

use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Something the cache wants its host to know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The cache file could not be read or parsed; starting cold
    CacheFileReadError { path: PathBuf, reason: String },

    /// The cache file was written
    CacheFileWritten(PathBuf),

    /// The cache file could not be written
    CacheFileWriteError { path: PathBuf, reason: String },

    /// Result of the pre-build invalidation
    ChangedDeps {
        invalidated: Vec<PathBuf>,
        deleted: Vec<PathBuf>,
    },

    /// A package root was seen for the first time this build
    PackageDiscovered { root: PathBuf },
}

/// Optional sender for [`CacheEvent`]s
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<CacheEvent>>,
}

impl EventSink {
    /// A sink that drops everything
    pub fn none() -> Self {
        Self::default()
    }

    /// A sink that forwards to `tx`
    pub fn channel(tx: UnboundedSender<CacheEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Deliver an event, ignoring a closed receiver
    pub fn emit(&self, event: CacheEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
