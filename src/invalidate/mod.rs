//! Pre-build invalidation
//!
//! Runs four passes over the cached state, strictly in this order:
//!
//! 1. [`Stage::PackagePathCheck`]: drop stale file -> package associations
//! 2. [`Stage::PackageCheck`]: evict changed or deleted manifests
//! 3. [`Stage::ModuleCheck`]: evict changed or deleted module files
//! 4. [`Stage::DependentCheck`]: evict modules whose transform inputs changed
//!
//! Each pass fans out its filesystem checks but only starts once the
//! previous pass has applied its evictions, because later passes read maps
//! the earlier ones mutate.

pub mod dependents;
pub mod modules;
pub mod package_paths;
pub mod packages;
pub mod scan;

pub use modules::RetryQueue;
pub use package_paths::{PackagePathInvalidator, PackagePathOutcome};
pub use scan::{ScanHandler, ScanOutcome, Scanner, StreamCheck};

use crate::cache::CacheState;
use crate::fs::Filesystem;
use crate::options::EngineOptions;
use crate::writes::WriteTracker;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Invalidation pipeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    PackagePathCheck,
    PackageCheck,
    ModuleCheck,
    DependentCheck,
    Done,
}

impl Stage {
    /// The stage that follows this one; `Done` wraps back to `Idle`
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::PackagePathCheck,
            Self::PackagePathCheck => Self::PackageCheck,
            Self::PackageCheck => Self::ModuleCheck,
            Self::ModuleCheck => Self::DependentCheck,
            Self::DependentCheck => Self::Done,
            Self::Done => Self::Idle,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PackagePathCheck => "package-path check",
            Self::PackageCheck => "package check",
            Self::ModuleCheck => "module check",
            Self::DependentCheck => "dependent check",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Paths changed since the previous build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    pub invalidated: BTreeSet<PathBuf>,
    pub deleted: BTreeSet<PathBuf>,
}

impl InvalidationReport {
    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty() && self.deleted.is_empty()
    }

    /// Number of distinct paths across both sets
    pub fn len(&self) -> usize {
        self.invalidated.union(&self.deleted).count()
    }

    /// Merge a pass's outcome into the report
    pub fn absorb(&mut self, outcome: ScanOutcome) {
        self.invalidated.extend(outcome.invalidated);
        self.deleted.extend(outcome.deleted);
    }
}

/// Drives the four invalidation passes over one [`CacheState`]
pub struct Invalidator<'a> {
    fs: &'a dyn Filesystem,
    options: &'a EngineOptions,
    writes: &'a WriteTracker,
}

impl<'a> Invalidator<'a> {
    pub fn new(
        fs: &'a dyn Filesystem,
        options: &'a EngineOptions,
        writes: &'a WriteTracker,
    ) -> Self {
        Self {
            fs,
            options,
            writes,
        }
    }

    /// Run every pass to completion and report what changed
    pub async fn run(&self, state: &mut CacheState) -> InvalidationReport {
        let scanner = Scanner::new(self.fs, self.options.concurrency);
        let mut report = InvalidationReport::default();
        let mut stage = Stage::Idle.next();

        while stage != Stage::Done {
            let before = report.len();
            match stage {
                Stage::PackagePathCheck => {
                    let outcome = PackagePathInvalidator::new(
                        self.fs,
                        self.options.concurrency,
                        &self.options.manifest_name,
                        &self.options.isolation_dir,
                    )
                    .run(&mut state.files_package_paths)
                    .await;

                    if !outcome.removed_roots.is_empty() || !outcome.discovered_roots.is_empty() {
                        debug!(
                            "Package roots without manifest: {:?}; new package roots: {:?}",
                            outcome.removed_roots, outcome.discovered_roots
                        );
                    }

                    // A file headed for a different package must be resolved again
                    for file in &outcome.dissociated {
                        state.evict_module(file);
                        state.forget_mtime_if_unreferenced(file);
                    }
                    report.invalidated.extend(outcome.dissociated);
                }
                Stage::PackageCheck => {
                    let outcome =
                        packages::check_packages(&scanner, state, &self.options.manifest_name)
                            .await;
                    report.absorb(outcome);
                }
                Stage::ModuleCheck => {
                    let outcome = modules::check_modules(&scanner, state, self.writes).await;
                    report.absorb(outcome);
                }
                Stage::DependentCheck => {
                    let changed: BTreeSet<PathBuf> =
                        report.invalidated.union(&report.deleted).cloned().collect();
                    let outcome = dependents::check_dependents(&scanner, state, &changed).await;
                    report.absorb(outcome);
                }
                Stage::Idle | Stage::Done => {}
            }
            debug!("Finished {}: {} new path(s)", stage, report.len() - before);
            stage = stage.next();
        }

        report
    }
}
