//! Engine options

use crate::error::{ModcacheError, ModcacheResult};
use std::path::Path;

/// Default number of concurrent stat calls per invalidation pass
pub const DEFAULT_CONCURRENCY: usize = 40;

/// Default package manifest file name
pub const DEFAULT_MANIFEST_NAME: &str = "package.json";

/// Default dependency-isolation directory name
pub const DEFAULT_ISOLATION_DIR: &str = "node_modules";

/// Tunables for invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum in-flight stat calls per pass
    pub concurrency: usize,

    /// File name that marks a package root
    pub manifest_name: String,

    /// Directory name whose package roots are assumed stable
    pub isolation_dir: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            isolation_dir: DEFAULT_ISOLATION_DIR.to_string(),
        }
    }
}

impl EngineOptions {
    /// Reject options the engine cannot run with
    pub fn validate(&self) -> ModcacheResult<()> {
        if self.concurrency == 0 {
            return Err(ModcacheError::invalid_option(
                "concurrency",
                "must be greater than zero",
            ));
        }
        if !is_bare_name(&self.manifest_name) {
            return Err(ModcacheError::invalid_option(
                "manifest_name",
                format!("'{}' must be a plain file name", self.manifest_name),
            ));
        }
        if !is_bare_name(&self.isolation_dir) {
            return Err(ModcacheError::invalid_option(
                "isolation_dir",
                format!("'{}' must be a plain directory name", self.isolation_dir),
            ));
        }
        Ok(())
    }
}

/// A single, non-empty, non-special path component
fn is_bare_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && Path::new(name).components().count() == 1
        && !name.contains('/')
        && !name.contains('\\')
}
