//! Cached module invalidation
//!
//! Module files are scanned like any other tracked path. The exception is a
//! module produced by the build pipeline that is still in flight: it has a
//! cached record but was never observed on disk. Such paths are decided by
//! comparing the cached source with the source the host streamed, and wait
//! in a [`RetryQueue`] while the host still has writes pending.

use super::scan::{ScanHandler, ScanOutcome, Scanner, StreamCheck};
use crate::cache::{CacheState, ModuleRecord};
use crate::writes::WriteTracker;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths waiting for the host's writes to drain
#[derive(Debug, Default)]
pub struct RetryQueue {
    paths: VecDeque<PathBuf>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push_back(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Take every queued path, leaving the queue empty
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.paths.drain(..).collect()
    }
}

impl FromIterator<PathBuf> for RetryQueue {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

/// Compare a cached record against what the host streamed for `path`
fn stream_check(
    modules: &BTreeMap<PathBuf, ModuleRecord>,
    writes: &WriteTracker,
    path: &Path,
) -> StreamCheck {
    if writes.pending() > 0 {
        return StreamCheck::Pending;
    }
    let Some(record) = modules.get(path) else {
        return StreamCheck::Unchanged;
    };
    match writes.streamed_source(path) {
        Some(source) if source == record.source => StreamCheck::Unchanged,
        _ => StreamCheck::Changed,
    }
}

struct ModuleHandler<'a> {
    modules: &'a mut BTreeMap<PathBuf, ModuleRecord>,
    writes: &'a WriteTracker,
}

impl ScanHandler for ModuleHandler<'_> {
    fn evict(&mut self, path: &Path) {
        self.modules.remove(path);
    }

    fn check_unmaterialized(&mut self, path: &Path) -> Option<StreamCheck> {
        Some(stream_check(self.modules, self.writes, path))
    }
}

/// Scan every cached module file, then settle deferred streamed modules
pub async fn check_modules(
    scanner: &Scanner<'_>,
    state: &mut CacheState,
    writes: &WriteTracker,
) -> ScanOutcome {
    let keys: Vec<PathBuf> = state.modules.keys().cloned().collect();
    let mut handler = ModuleHandler {
        modules: &mut state.modules,
        writes,
    };
    let mut outcome = scanner.scan(&mut state.mtimes, keys, &mut handler).await;

    let mut queue: RetryQueue = std::mem::take(&mut outcome.deferred).into_iter().collect();
    while !queue.is_empty() {
        debug!("Waiting on pending writes to check {} module(s)", queue.len());
        writes.wait_drained().await;

        for path in queue.take() {
            match stream_check(&state.modules, writes, &path) {
                StreamCheck::Pending => queue.push(path),
                StreamCheck::Changed => {
                    state.evict_module(&path);
                    outcome.invalidated.insert(path);
                }
                StreamCheck::Unchanged => {}
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Timestamp;
    use crate::fs::memory::MemoryFs;
    use std::time::Duration;

    fn cached(state: &mut CacheState, file: &str, source: &str, mtime: Option<i64>) {
        state.insert_module(file.into(), ModuleRecord::new(file, source));
        if let Some(mtime) = mtime {
            state
                .mtimes
                .insert(PathBuf::from(file), Timestamp::from_millis(mtime));
        }
    }

    #[test]
    fn retry_queue_take_empties() {
        let mut queue: RetryQueue = [PathBuf::from("/a"), PathBuf::from("/b")].into_iter().collect();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().len(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn modified_module_is_evicted() {
        let fs = MemoryFs::new();
        fs.write("/p/a.js", 2);
        fs.write("/p/b.js", 1);
        let mut state = CacheState::new();
        cached(&mut state, "/p/a.js", "a", Some(1));
        cached(&mut state, "/p/b.js", "b", Some(1));

        let outcome =
            check_modules(&Scanner::new(&fs, 40), &mut state, &WriteTracker::new()).await;

        assert!(outcome.invalidated.contains(Path::new("/p/a.js")));
        assert!(!state.modules.contains_key(Path::new("/p/a.js")));
        assert!(state.modules.contains_key(Path::new("/p/b.js")));
    }

    #[tokio::test]
    async fn deleted_module_is_evicted() {
        let fs = MemoryFs::new();
        let mut state = CacheState::new();
        cached(&mut state, "/p/a.js", "a", Some(1));

        let outcome =
            check_modules(&Scanner::new(&fs, 40), &mut state, &WriteTracker::new()).await;

        assert!(outcome.deleted.contains(Path::new("/p/a.js")));
        assert!(state.modules.is_empty());
    }

    #[tokio::test]
    async fn streamed_module_with_same_source_is_kept() {
        let fs = MemoryFs::new();
        let writes = WriteTracker::new();
        writes.record_streamed_source("/out/gen.js", "same");
        let mut state = CacheState::new();
        cached(&mut state, "/out/gen.js", "same", None);

        let outcome = check_modules(&Scanner::new(&fs, 40), &mut state, &writes).await;

        assert_eq!(outcome, ScanOutcome::default());
        assert!(state.modules.contains_key(Path::new("/out/gen.js")));
    }

    #[tokio::test]
    async fn streamed_module_without_recorded_source_is_invalidated() {
        let fs = MemoryFs::new();
        let mut state = CacheState::new();
        cached(&mut state, "/out/gen.js", "old", None);

        let outcome =
            check_modules(&Scanner::new(&fs, 40), &mut state, &WriteTracker::new()).await;

        assert!(outcome.invalidated.contains(Path::new("/out/gen.js")));
        assert!(outcome.deleted.is_empty());
        assert!(state.modules.is_empty());
    }

    #[tokio::test]
    async fn pending_writes_defer_the_check() {
        let fs = MemoryFs::new();
        let writes = WriteTracker::new();
        let mut state = CacheState::new();
        cached(&mut state, "/out/gen.js", "old", None);

        let guard = writes.guard();
        let host = writes.clone();
        let flush = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            host.record_streamed_source("/out/gen.js", "new");
            drop(guard);
        });

        let outcome = check_modules(&Scanner::new(&fs, 40), &mut state, &writes).await;
        flush.await.unwrap();

        assert!(outcome.invalidated.contains(Path::new("/out/gen.js")));
        assert!(outcome.deferred.is_empty());
        assert!(state.modules.is_empty());
    }
}
