//! Error types for modcache
//!
//! All fallible operations return `ModcacheResult<T>`. Invalidation passes
//! themselves never fail; only setup, configuration and the CLI surface
//! produce errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for modcache operations
pub type ModcacheResult<T> = Result<T, ModcacheError>;

/// All errors that can occur in modcache
#[derive(Error, Debug)]
pub enum ModcacheError {
    // Setup errors
    #[error("Invalid engine option {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache file errors
    #[error("Failed to parse cache file {path}: {reason}")]
    CacheFileParse { path: PathBuf, reason: String },

    #[error("No cache file configured")]
    NoCacheFile,

    #[error("Cache file not found: {0}")]
    CacheFileMissing(PathBuf),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl ModcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid option error
    pub fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoCacheFile => {
                Some("Pass --cache-file or run: modcache config init, then set cache.file")
            }
            Self::CacheFileMissing(_) => {
                Some("Run a build with caching enabled first, or check the path")
            }
            Self::ConfigInvalid { .. } => Some("Run: modcache config path, then fix the file"),
            Self::InvalidOption { .. } => Some("Check the [cache] section of your config"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModcacheError::invalid_option("concurrency", "must be greater than zero");
        let msg = err.to_string();
        assert!(msg.contains("concurrency"));
        assert!(msg.contains("greater than zero"));
    }

    #[test]
    fn io_error_keeps_context() {
        let err = ModcacheError::io(
            "reading cache file /tmp/cache.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/tmp/cache.json"));
    }

    #[test]
    fn error_hint() {
        assert!(ModcacheError::NoCacheFile.hint().is_some());
        assert_eq!(ModcacheError::User("x".to_string()).hint(), None);
    }
}
