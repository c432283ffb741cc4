//! Filesystem access used by invalidation
//!
//! Every stat and existence check goes through the [`Filesystem`] trait so
//! that a host with a virtual filesystem can drive the engine, and so that
//! tests can move mtimes without waiting on the OS clock.

use crate::cache::Timestamp;
use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Abstract filesystem interface
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Last modification time of `path`
    async fn modified(&self, path: &Path) -> io::Result<Timestamp>;

    /// Whether `path` currently exists
    async fn exists(&self, path: &Path) -> bool;
}

/// The real filesystem, backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl Filesystem for LocalFs {
    async fn modified(&self, path: &Path) -> io::Result<Timestamp> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Timestamp::from(metadata.modified()?))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
