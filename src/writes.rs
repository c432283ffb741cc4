//! Pending-write tracking for streamed build output
//!
//! A bundler may still be flushing the previous pipeline's output when the
//! next build starts. Modules produced by that output have no file on disk
//! yet, so their staleness cannot be decided by mtime. The host counts its
//! in-flight writes here and reports the source it streamed; invalidation
//! waits for the count to reach zero before deciding those modules.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Cloneable handle shared between the engine and its host
#[derive(Debug, Clone)]
pub struct WriteTracker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    pending: watch::Sender<usize>,
    streamed: Mutex<HashMap<PathBuf, String>>,
}

impl WriteTracker {
    /// Create a tracker with no pending writes
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                pending,
                streamed: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of writes still in flight
    pub fn pending(&self) -> usize {
        *self.inner.pending.borrow()
    }

    /// Mark the start of a write
    pub fn begin(&self) {
        self.inner.pending.send_modify(|n| *n += 1);
    }

    /// Mark the end of a write
    pub fn finish(&self) {
        self.inner.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Begin a write that finishes when the guard drops
    pub fn guard(&self) -> WriteGuard {
        self.begin();
        WriteGuard {
            tracker: self.clone(),
        }
    }

    /// Resolve once no writes are pending
    pub async fn wait_drained(&self) {
        let mut rx = self.inner.pending.subscribe();
        // The sender lives in `inner`, so this only returns once drained
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Remember the source the host produced for `path` in this pipeline
    pub fn record_streamed_source(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.streamed().insert(path.into(), source.into());
    }

    /// The streamed source for `path`, if the host recorded one
    pub fn streamed_source(&self, path: &Path) -> Option<String> {
        self.streamed().get(path).cloned()
    }

    /// Forget all streamed sources
    pub fn clear_streamed(&self) {
        self.streamed().clear();
    }

    fn streamed(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.inner
            .streamed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WriteTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Finishes its write on drop
#[derive(Debug)]
pub struct WriteGuard {
    tracker: WriteTracker,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}
