//! Transform dependency invalidation
//!
//! A transform may read files that never show up as module dependencies
//! (templates, stylesheets, data files). The dependent-file index records
//! which modules read each of them; when one changes, every module that
//! read it is stale, even though the module's own file is untouched.

use super::scan::{ScanOutcome, Scanner};
use crate::cache::CacheState;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prune and scan the dependent-file index
///
/// `changed_modules` are modules already invalidated or deleted this build;
/// their associations are dropped before scanning since their transforms
/// will run again and re-report what they read. Modules evicted because a
/// dependent file changed are added to the outcome's `invalidated` set.
pub async fn check_dependents(
    scanner: &Scanner<'_>,
    state: &mut CacheState,
    changed_modules: &BTreeSet<PathBuf>,
) -> ScanOutcome {
    state.forget_dependents_of(changed_modules);

    let dependents: Vec<PathBuf> = state.dependent_files.keys().cloned().collect();
    let index = &mut state.dependent_files;
    let modules = &mut state.modules;
    let mut stale_modules: BTreeSet<PathBuf> = BTreeSet::new();

    let mut outcome = scanner
        .scan(&mut state.mtimes, dependents, &mut |dependent: &Path| {
            let Some(owners) = index.remove(dependent) else {
                return;
            };
            debug!(
                "{} changed, evicting {} module(s)",
                dependent.display(),
                owners.len()
            );
            for module in owners {
                modules.remove(&module);
                stale_modules.insert(module);
            }
        })
        .await;

    outcome.invalidated.extend(stale_modules);
    outcome
}
