//! Mtime tracking
//!
//! The "has this file changed" oracle. A path absent from `mtimes` has never
//! been successfully observed on disk.

use crate::cache::Timestamp;
use crate::fs::Filesystem;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Records the last observed mtime per path
pub struct MtimeTracker<'a> {
    fs: &'a dyn Filesystem,
    mtimes: &'a mut BTreeMap<PathBuf, Timestamp>,
}

impl<'a> MtimeTracker<'a> {
    /// Track mtimes in `mtimes`, statting through `fs`
    pub fn new(fs: &'a dyn Filesystem, mtimes: &'a mut BTreeMap<PathBuf, Timestamp>) -> Self {
        Self { fs, mtimes }
    }

    /// Stat `path` and store its mtime
    ///
    /// Returns `None` when the file cannot be stat'd; the previous entry is
    /// left untouched so the caller can decide between "deleted" and "not
    /// yet written".
    pub async fn observe(&mut self, path: &Path) -> Option<Timestamp> {
        match self.fs.modified(path).await {
            Ok(mtime) => {
                self.record(path.to_path_buf(), mtime);
                Some(mtime)
            }
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Observe `path` only if no mtime has been recorded for it yet
    pub async fn observe_if_untracked(&mut self, path: &Path) -> Option<Timestamp> {
        match self.previous(path) {
            Some(mtime) => Some(mtime),
            None => self.observe(path).await,
        }
    }

    /// The last recorded mtime for `path`
    pub fn previous(&self, path: &Path) -> Option<Timestamp> {
        self.mtimes.get(path).copied()
    }

    /// Store an mtime that was obtained elsewhere
    pub fn record(&mut self, path: PathBuf, mtime: Timestamp) {
        self.mtimes.insert(path, mtime);
    }

    /// Drop the entry for a file that no longer exists
    pub fn forget(&mut self, path: &Path) {
        self.mtimes.remove(path);
    }
}
