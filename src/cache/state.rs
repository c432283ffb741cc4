//! Cached build state
//!
//! [`CacheState`] is the single aggregate persisted between builds. It holds
//! five maps that together describe what the previous build observed:
//!
//! | Key | Value |
//! |-----|-------|
//! | `modules` | resolved module record per module file |
//! | `packages` | parsed manifest per package root directory |
//! | `mtimes` | last observed mtime per tracked file |
//! | `filesPackagePaths` | governing package root per file |
//! | `dependentFiles` | modules whose transform output read a non-module file |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File modification time in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Build from raw milliseconds
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Raw milliseconds since the epoch
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Convert to a UTC datetime, if representable
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self(DateTime::<Utc>::from(time).timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Target of a single dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepTarget {
    /// Resolved to another module identity
    Module(PathBuf),
    /// Deliberately left unresolved (`false` in bundler output)
    Excluded(bool),
}

impl DepTarget {
    /// The resolved module path, if any
    pub fn module(&self) -> Option<&Path> {
        match self {
            Self::Module(path) => Some(path),
            Self::Excluded(_) => None,
        }
    }
}

/// Cached dependency-resolution output for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Module id as reported by the bundler
    pub id: String,

    /// Absolute file path, when it differs from `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Source text after transforms
    pub source: String,

    /// Dependency specifier to resolved target
    #[serde(default)]
    pub deps: BTreeMap<String, DepTarget>,

    /// Bundler fields the cache does not interpret (entry, expose, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModuleRecord {
    /// Create a record for a module file
    pub fn new(file: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            id: file.to_string_lossy().into_owned(),
            file: Some(file),
            source: source.into(),
            deps: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// The key this record is cached under
    pub fn key(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.id))
    }

    /// Module identities this record depends on
    pub fn dependencies(&self) -> impl Iterator<Item = &Path> {
        self.deps.values().filter_map(DepTarget::module)
    }
}

/// Parsed package manifest plus the directory it governs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package root directory
    #[serde(rename = "__dirname", default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Manifest content
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PackageManifest {
    /// Create a manifest rooted at `root`
    pub fn new(root: impl Into<PathBuf>, fields: Map<String, Value>) -> Self {
        Self {
            root: Some(root.into()),
            fields,
        }
    }

    /// The `name` field, if present
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// The `version` field, if present
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }
}

/// Invert file -> package root into package root -> files
pub fn files_by_root(
    files_package_paths: &BTreeMap<PathBuf, PathBuf>,
) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
    let mut inverted: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    for (file, root) in files_package_paths {
        inverted
            .entry(root.clone())
            .or_default()
            .insert(file.clone());
    }
    inverted
}

/// Path of the manifest file governing `root`
pub fn manifest_path(root: &Path, manifest_name: &str) -> PathBuf {
    root.join(manifest_name)
}

/// The whole persisted cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheState {
    pub modules: BTreeMap<PathBuf, ModuleRecord>,
    pub packages: BTreeMap<PathBuf, PackageManifest>,
    pub mtimes: BTreeMap<PathBuf, Timestamp>,
    pub files_package_paths: BTreeMap<PathBuf, PathBuf>,
    pub dependent_files: BTreeMap<PathBuf, BTreeSet<PathBuf>>,

    /// Top-level keys written by other tools, kept for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CacheState {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing at all is cached
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
            && self.packages.is_empty()
            && self.mtimes.is_empty()
            && self.files_package_paths.is_empty()
            && self.dependent_files.is_empty()
    }

    // Module cache store

    /// Insert or replace a module record
    pub fn insert_module(&mut self, key: PathBuf, record: ModuleRecord) {
        self.modules.insert(key, record);
    }

    /// Remove a module record, returning whether it was cached
    pub fn evict_module(&mut self, key: &Path) -> bool {
        self.modules.remove(key).is_some()
    }

    // Package metadata store

    /// Cache a manifest unless one is already cached for its root
    pub fn insert_package_if_absent(&mut self, root: PathBuf, manifest: PackageManifest) {
        self.packages.entry(root).or_insert(manifest);
    }

    /// Associate a file with a package root unless it already has one
    pub fn associate_file_if_absent(&mut self, file: PathBuf, root: PathBuf) {
        self.files_package_paths.entry(file).or_insert(root);
    }

    /// Manifest governing `file`, if both the association and manifest are cached
    pub fn package_for_file(&self, file: &Path) -> Option<&PackageManifest> {
        let root = self.files_package_paths.get(file)?;
        self.packages.get(root)
    }

    /// Invert `filesPackagePaths` into package root -> files
    pub fn files_by_package_root(&self) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
        files_by_root(&self.files_package_paths)
    }

    /// Drop every file association pointing at `root`, returning the files
    pub fn dissociate_root(&mut self, root: &Path) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = self
            .files_package_paths
            .iter()
            .filter(|(_, r)| r.as_path() == root)
            .map(|(f, _)| f.clone())
            .collect();
        for file in &files {
            self.files_package_paths.remove(file);
        }
        files
    }

    // Dependent-file index

    /// Record that `module`'s transform output read `dependent`
    pub fn add_dependent(&mut self, dependent: PathBuf, module: PathBuf) {
        self.dependent_files
            .entry(dependent)
            .or_default()
            .insert(module);
    }

    /// Forget `modules` in every dependent-file entry, pruning emptied entries
    ///
    /// A pruned dependent file also loses its mtime, so the next report of it
    /// observes the file afresh.
    pub fn forget_dependents_of<'a>(&mut self, modules: impl IntoIterator<Item = &'a PathBuf>) {
        let modules: BTreeSet<&PathBuf> = modules.into_iter().collect();
        if modules.is_empty() {
            return;
        }
        let mut emptied = Vec::new();
        self.dependent_files.retain(|dependent, readers| {
            readers.retain(|m| !modules.contains(m));
            if readers.is_empty() {
                emptied.push(dependent.clone());
                return false;
            }
            true
        });
        for dependent in emptied {
            self.forget_mtime_if_unreferenced(&dependent);
        }
    }

    // Mtimes

    /// Drop the mtime of `path` unless a module or dependent entry still uses it
    pub fn forget_mtime_if_unreferenced(&mut self, path: &Path) {
        if !self.modules.contains_key(path) && !self.dependent_files.contains_key(path) {
            self.mtimes.remove(path);
        }
    }
}
