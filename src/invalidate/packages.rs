//! Cached manifest invalidation
//!
//! Each cached package root is checked through its manifest file. A changed
//! manifest evicts the cached content; a deleted one also drops every file
//! association pointing at that root.

use super::scan::{ScanOutcome, Scanner};
use crate::cache::{manifest_path, CacheState};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scan the manifests of all cached packages
///
/// Paths in the outcome are manifest file paths, not package roots.
pub async fn check_packages(
    scanner: &Scanner<'_>,
    state: &mut CacheState,
    manifest_name: &str,
) -> ScanOutcome {
    let roots: HashMap<PathBuf, PathBuf> = state
        .packages
        .keys()
        .map(|root| (manifest_path(root, manifest_name), root.clone()))
        .collect();

    let packages = &mut state.packages;
    let outcome = scanner
        .scan(
            &mut state.mtimes,
            roots.keys().cloned(),
            &mut |manifest: &Path| {
                if let Some(root) = roots.get(manifest) {
                    packages.remove(root);
                }
            },
        )
        .await;

    for manifest in &outcome.deleted {
        if let Some(root) = roots.get(manifest) {
            let files = state.dissociate_root(root);
            if !files.is_empty() {
                debug!(
                    "Dropped {} file association(s) for removed package {}",
                    files.len(),
                    root.display()
                );
            }
        }
    }

    outcome
}
