//! Bounded file stat scanning
//!
//! Stats a set of tracked paths with at most `concurrency` calls in flight
//! and classifies each against its recorded mtime:
//!
//! | Stat | Recorded mtime | Result |
//! |------|----------------|--------|
//! | ok, same | present | unchanged |
//! | ok, different | present | invalidated |
//! | ok | absent | invalidated (first sighting) |
//! | fails | present | deleted |
//! | fails | absent | handler decides, else deleted |
//!
//! Invalidated and deleted entries are evicted through the handler before
//! [`Scanner::scan`] returns.

use crate::cache::{MtimeTracker, Timestamp};
use crate::fs::Filesystem;
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Verdict for a path that is cached but not on disk yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCheck {
    /// The streamed content differs; invalidate now
    Changed,
    /// The streamed content matches the cache
    Unchanged,
    /// Writes are still in flight; ask again once they drain
    Pending,
}

/// Receives the scanner's decisions
pub trait ScanHandler {
    /// Remove the cache entry for `path`
    fn evict(&mut self, path: &Path);

    /// Decide a path that cannot be stat'd and was never observed
    ///
    /// `None` classifies the path as deleted.
    fn check_unmaterialized(&mut self, _path: &Path) -> Option<StreamCheck> {
        None
    }
}

impl<F> ScanHandler for F
where
    F: FnMut(&Path),
{
    fn evict(&mut self, path: &Path) {
        self(path)
    }
}

/// Classified paths from one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub invalidated: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,

    /// Paths the handler asked to re-check after writes drain
    pub deferred: BTreeSet<PathBuf>,
}

/// Concurrency-bounded mtime scanner
pub struct Scanner<'a> {
    fs: &'a dyn Filesystem,
    concurrency: usize,
}

impl<'a> Scanner<'a> {
    /// Scan through `fs` with at most `concurrency` stats in flight
    pub fn new(fs: &'a dyn Filesystem, concurrency: usize) -> Self {
        Self {
            fs,
            concurrency: concurrency.max(1),
        }
    }

    /// Stat `paths`, update `mtimes` and evict stale entries via `handler`
    pub async fn scan<I, H>(
        &self,
        mtimes: &mut BTreeMap<PathBuf, Timestamp>,
        paths: I,
        handler: &mut H,
    ) -> ScanOutcome
    where
        I: IntoIterator<Item = PathBuf>,
        H: ScanHandler + ?Sized,
    {
        let fs = self.fs;
        let mut tracker = MtimeTracker::new(fs, mtimes);
        let mut outcome = ScanOutcome::default();
        let mut scanned = 0usize;

        let mut stats = stream::iter(paths)
            .map(|path| async move {
                let result = fs.modified(&path).await;
                (path, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((path, result)) = stats.next().await {
            scanned += 1;
            let previous = tracker.previous(&path);

            match result {
                Ok(mtime) => {
                    if previous != Some(mtime) {
                        handler.evict(&path);
                        outcome.invalidated.insert(path.clone());
                    }
                    tracker.record(path, mtime);
                }
                Err(e) => {
                    let verdict = match previous {
                        None => handler.check_unmaterialized(&path),
                        Some(_) => None,
                    };
                    match verdict {
                        Some(StreamCheck::Changed) => {
                            handler.evict(&path);
                            outcome.invalidated.insert(path);
                        }
                        Some(StreamCheck::Unchanged) => {}
                        Some(StreamCheck::Pending) => {
                            outcome.deferred.insert(path);
                        }
                        None => {
                            debug!("{} is gone: {}", path.display(), e);
                            handler.evict(&path);
                            tracker.forget(&path);
                            outcome.deleted.insert(path);
                        }
                    }
                }
            }
        }

        debug!(
            "Scanned {} files: {} invalidated, {} deleted, {} deferred",
            scanned,
            outcome.invalidated.len(),
            outcome.deleted.len(),
            outcome.deferred.len()
        );
        outcome
    }
}
