//! Package boundary invalidation
//!
//! A file's governing package is the nearest ancestor directory holding a
//! manifest. That association is cached, so it goes stale when a manifest is
//! deleted or a new one appears between the recorded root and the file.
//! This pass finds both cases and drops the stale associations; the next
//! resolution rediscovers the correct root.
//!
//! Roots inside the dependency-isolation directory are skipped: installed
//! dependencies are assumed not to grow or lose manifests between builds.
//! That is an approximation, not a guarantee.

use crate::cache::{files_by_root, manifest_path};
use crate::fs::Filesystem;
use futures_util::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagePathOutcome {
    /// Files whose package association was dropped
    pub dissociated: BTreeSet<PathBuf>,

    /// Recorded roots whose manifest no longer exists
    pub removed_roots: BTreeSet<PathBuf>,

    /// Directories found to hold a new manifest between a root and its files
    pub discovered_roots: BTreeSet<PathBuf>,
}

/// Detects stale file -> package root associations
pub struct PackagePathInvalidator<'a> {
    fs: &'a dyn Filesystem,
    concurrency: usize,
    manifest_name: &'a str,
    isolation_dir: &'a str,
}

impl<'a> PackagePathInvalidator<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        concurrency: usize,
        manifest_name: &'a str,
        isolation_dir: &'a str,
    ) -> Self {
        Self {
            fs,
            concurrency: concurrency.max(1),
            manifest_name,
            isolation_dir,
        }
    }

    /// Prune stale entries from `files_package_paths`
    pub async fn run(
        &self,
        files_package_paths: &mut BTreeMap<PathBuf, PathBuf>,
    ) -> PackagePathOutcome {
        let mut outcome = PackagePathOutcome::default();

        let mut by_root = files_by_root(files_package_paths);
        by_root.retain(|root, _| !self.is_isolated(root));

        // Directory -> whether it holds a manifest, shared across all roots
        let mut known = self.has_manifest(by_root.keys().cloned()).await;

        let mut candidates: Vec<(PathBuf, BTreeSet<PathBuf>)> = Vec::new();
        for (root, files) in by_root {
            if known.get(&root).copied().unwrap_or(false) {
                candidates.push((root, files));
                continue;
            }
            debug!(
                "Manifest for {} is gone, dropping {} file(s)",
                root.display(),
                files.len()
            );
            for file in files {
                files_package_paths.remove(&file);
                outcome.dissociated.insert(file);
            }
            outcome.removed_roots.insert(root);
        }

        // Walk interstitial directories one level at a time, nearest the
        // root first, so a manifest found high up settles every file below
        // it without statting deeper directories.
        let mut depth = 1;
        while !candidates.is_empty() {
            let level: BTreeSet<PathBuf> = candidates
                .iter()
                .flat_map(|(root, files)| {
                    files
                        .iter()
                        .filter_map(move |file| interstitial_dir(root, file, depth))
                })
                .collect();

            let unknown: Vec<PathBuf> = level
                .into_iter()
                .filter(|dir| !known.contains_key(dir))
                .collect();
            known.extend(self.has_manifest(unknown).await);

            for (root, files) in candidates.iter_mut() {
                files.retain(|file| match interstitial_dir(root, file, depth) {
                    Some(dir) if known.get(&dir).copied().unwrap_or(false) => {
                        debug!(
                            "{} now belongs to {} instead of {}",
                            file.display(),
                            dir.display(),
                            root.display()
                        );
                        files_package_paths.remove(file);
                        outcome.dissociated.insert(file.clone());
                        outcome.discovered_roots.insert(dir);
                        false
                    }
                    Some(_) => true,
                    None => false,
                });
            }
            candidates.retain(|(_, files)| !files.is_empty());
            depth += 1;
        }

        outcome
    }

    fn is_isolated(&self, root: &Path) -> bool {
        root.components()
            .any(|c| c.as_os_str() == self.isolation_dir)
    }

    /// Check manifest existence for `dirs` with bounded concurrency
    async fn has_manifest<I>(&self, dirs: I) -> HashMap<PathBuf, bool>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let fs = self.fs;
        let manifest_name = self.manifest_name;
        stream::iter(dirs)
            .map(|dir| async move {
                let exists = fs.exists(&manifest_path(&dir, manifest_name)).await;
                (dir, exists)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

/// The directory `depth` levels below `root` on the way to `file`
///
/// Only directories strictly between the two count; `None` once `depth`
/// reaches the file itself or when `file` is not under `root`.
fn interstitial_dir(root: &Path, file: &Path, depth: usize) -> Option<PathBuf> {
    let relative = file.strip_prefix(root).ok()?;
    let components: Vec<_> = relative.components().collect();
    if depth == 0 || depth >= components.len() {
        return None;
    }
    let mut dir = root.to_path_buf();
    dir.extend(&components[..depth]);
    Some(dir)
}
