//! Discovery operations
//!
//! The host reports what it learns during a build through these calls. They
//! are the only writers besides invalidation.

use super::BuildCache;
use crate::cache::{
    manifest_path, CacheEvent, DepTarget, ModuleRecord, MtimeTracker, PackageManifest,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A dependency record as emitted by the bundler
///
/// Identity and source are loosely typed here because bundlers emit records
/// the cache cannot use (numeric ids, missing source); those are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveredModule {
    #[serde(default)]
    pub id: Option<Value>,

    #[serde(default)]
    pub file: Option<Value>,

    #[serde(default)]
    pub source: Option<Value>,

    #[serde(default)]
    pub deps: BTreeMap<String, DepTarget>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveredModule {
    /// A record for `file` with the given transformed source
    pub fn new(file: impl AsRef<Path>, source: impl Into<String>) -> Self {
        let file = file.as_ref().to_string_lossy().into_owned();
        Self {
            id: Some(Value::String(file.clone())),
            file: Some(Value::String(file)),
            source: Some(Value::String(source.into())),
            ..Self::default()
        }
    }

    /// Cache key: `file`, falling back to `id`, as long as it is a string
    fn identity(&self) -> Option<&str> {
        match &self.file {
            Some(file) => file.as_str(),
            None => self.id.as_ref().and_then(Value::as_str),
        }
    }

    fn into_record(self, identity: &str) -> Option<ModuleRecord> {
        let source = match self.source {
            Some(Value::String(source)) => source,
            _ => return None,
        };
        let id = match self.id {
            Some(Value::String(id)) => id,
            _ => identity.to_string(),
        };
        let file = match self.file {
            Some(Value::String(file)) => Some(PathBuf::from(file)),
            _ => None,
        };
        Some(ModuleRecord {
            id,
            file,
            source,
            deps: self.deps,
            extra: self.extra,
        })
    }
}

impl BuildCache {
    /// Cache a freshly resolved module
    ///
    /// Returns `false` when the record has no usable identity or source; it
    /// is then neither cached nor invalidated.
    pub async fn record_module(&mut self, module: DiscoveredModule) -> bool {
        let Some(identity) = module.identity().map(str::to_string) else {
            warn!("Skipping dependency record without a file or string id");
            return false;
        };
        let Some(record) = module.into_record(&identity) else {
            warn!("Skipping dependency record without source: {}", identity);
            return false;
        };
        let key = record.key();
        if !key.is_absolute() {
            warn!("Skipping dependency record with relative identity {}", identity);
            return false;
        }

        self.state.insert_module(key.clone(), record);
        MtimeTracker::new(self.fs.as_ref(), &mut self.state.mtimes)
            .observe_if_untracked(&key)
            .await;
        true
    }

    /// Record the manifest governing `file`
    ///
    /// Existing entries win: a package or association already cached this
    /// build is not replaced. Returns whether the package root was new.
    pub async fn record_package(
        &mut self,
        file: impl Into<PathBuf>,
        manifest: PackageManifest,
    ) -> bool {
        let Some(root) = manifest.root.clone() else {
            debug!("Ignoring manifest without a root directory");
            return false;
        };
        let file = file.into();

        let is_new = !self.state.packages.contains_key(&root);
        let manifest_file = manifest_path(&root, &self.options.manifest_name);
        self.state.insert_package_if_absent(root.clone(), manifest);
        self.state.associate_file_if_absent(file, root.clone());

        MtimeTracker::new(self.fs.as_ref(), &mut self.state.mtimes)
            .observe_if_untracked(&manifest_file)
            .await;

        if is_new {
            debug!("Discovered package {}", root.display());
            self.events.emit(CacheEvent::PackageDiscovered { root });
        }
        is_new
    }

    /// Record that `module`'s transform read `dependent`
    pub async fn record_dependent_file(
        &mut self,
        dependent: impl Into<PathBuf>,
        module: impl Into<PathBuf>,
    ) {
        let dependent = dependent.into();
        self.state.add_dependent(dependent.clone(), module.into());
        MtimeTracker::new(self.fs.as_ref(), &mut self.state.mtimes)
            .observe_if_untracked(&dependent)
            .await;
    }

    /// Report the source produced for `path` before it reaches disk
    pub fn record_streamed_source(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.writes.record_streamed_source(path, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheState, EventSink, Timestamp};
    use crate::fs::memory::MemoryFs;
    use crate::options::EngineOptions;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn engine(fs: &Arc<MemoryFs>) -> BuildCache {
        BuildCache::new(CacheState::new(), fs.clone(), EngineOptions::default()).unwrap()
    }

    fn discovered(value: serde_json::Value) -> DiscoveredModule {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn records_module_and_observes_mtime() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/p/a.js", 7);
        let mut cache = engine(&fs);

        let recorded = cache
            .record_module(discovered(json!({
                "id": "/p/a.js",
                "file": "/p/a.js",
                "source": "require('./b')",
                "deps": {"./b": "/p/b.js"},
                "entry": true
            })))
            .await;

        assert!(recorded);
        let record = &cache.module_cache()[Path::new("/p/a.js")];
        assert_eq!(record.extra["entry"], true);
        assert_eq!(record.dependencies().collect::<Vec<_>>(), vec![Path::new("/p/b.js")]);
        assert_eq!(
            cache.state().mtimes[Path::new("/p/a.js")],
            Timestamp::from_millis(7)
        );
    }

    #[tokio::test]
    async fn falls_back_to_string_id() {
        let fs = Arc::new(MemoryFs::new());
        let mut cache = engine(&fs);

        assert!(
            cache
                .record_module(discovered(json!({"id": "/p/a.js", "source": ""})))
                .await
        );
        assert!(cache.module_cache().contains_key(Path::new("/p/a.js")));
        // Not on disk, so no mtime yet
        assert!(cache.state().mtimes.is_empty());
    }

    #[tokio::test]
    async fn skips_records_without_identity_or_source() {
        let fs = Arc::new(MemoryFs::new());
        let mut cache = engine(&fs);

        for value in [
            json!({"id": 4, "source": "x"}),
            json!({"source": "x"}),
            json!({"file": "/p/a.js"}),
            json!({"file": "/p/a.js", "source": 12}),
            json!({"file": "relative/a.js", "source": "x"}),
        ] {
            assert!(!cache.record_module(discovered(value)).await);
        }
        assert!(cache.module_cache().is_empty());
    }

    #[tokio::test]
    async fn does_not_overwrite_recorded_mtime() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/p/a.js", 1);
        let mut cache = engine(&fs);
        cache
            .record_module(DiscoveredModule::new("/p/a.js", "one"))
            .await;

        fs.write("/p/a.js", 2);
        cache
            .record_module(DiscoveredModule::new("/p/a.js", "two"))
            .await;

        assert_eq!(
            cache.state().mtimes[Path::new("/p/a.js")],
            Timestamp::from_millis(1)
        );
        assert_eq!(cache.module_cache()[Path::new("/p/a.js")].source, "two");
    }

    #[tokio::test]
    async fn package_is_first_writer_wins() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/p/package.json", 3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut cache = engine(&fs).with_events(EventSink::channel(tx));

        let first = PackageManifest::new("/p", json!({"name": "one"}).as_object().cloned().unwrap());
        let second = PackageManifest::new("/p", json!({"name": "two"}).as_object().cloned().unwrap());
        assert!(cache.record_package("/p/a.js", first).await);
        assert!(!cache.record_package("/p/b.js", second).await);

        assert_eq!(cache.state().packages[Path::new("/p")].name(), Some("one"));
        assert_eq!(cache.package_cache().len(), 2);
        assert_eq!(
            cache.state().mtimes[Path::new("/p/package.json")],
            Timestamp::from_millis(3)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            CacheEvent::PackageDiscovered {
                root: PathBuf::from("/p")
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn manifest_without_root_is_ignored() {
        let fs = Arc::new(MemoryFs::new());
        let mut cache = engine(&fs);
        let manifest = PackageManifest {
            root: None,
            fields: Map::new(),
        };

        assert!(!cache.record_package("/p/a.js", manifest).await);
        assert!(cache.state().is_empty());
    }

    #[tokio::test]
    async fn dependent_file_observed_once() {
        let fs = Arc::new(MemoryFs::new());
        fs.write("/p/style.css", 4);
        let mut cache = engine(&fs);

        cache.record_dependent_file("/p/style.css", "/p/a.js").await;
        cache.record_dependent_file("/p/style.css", "/p/b.js").await;

        assert_eq!(cache.state().dependent_files[Path::new("/p/style.css")].len(), 2);
        assert_eq!(
            cache.state().mtimes[Path::new("/p/style.css")],
            Timestamp::from_millis(4)
        );
    }

    #[tokio::test]
    async fn streamed_module_settles_after_writes_drain() {
        let fs = Arc::new(MemoryFs::new());
        let mut cache = engine(&fs);
        cache
            .record_module(DiscoveredModule::new("/out/gen.js", "v1"))
            .await;

        let guard = cache.writes().guard();
        let host = cache.writes().clone();
        let flush = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            host.record_streamed_source("/out/gen.js", "v1");
            drop(guard);
        });

        let report = cache.invalidate_before_build().await;
        flush.await.unwrap();

        assert!(report.is_empty());
        assert!(cache.module_cache().contains_key(Path::new("/out/gen.js")));
    }

    #[tokio::test]
    async fn streamed_module_with_new_source_is_invalidated() {
        let fs = Arc::new(MemoryFs::new());
        let mut cache = engine(&fs);
        cache
            .record_module(DiscoveredModule::new("/out/gen.js", "v1"))
            .await;
        cache.record_streamed_source("/out/gen.js", "v2");

        let report = cache.invalidate_before_build().await;

        assert!(report.invalidated.contains(Path::new("/out/gen.js")));
        assert!(cache.module_cache().is_empty());
    }
}
