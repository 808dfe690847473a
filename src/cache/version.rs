//! Versioned cache-generation naming.
//!
//! A generation is named `<prefix>-v<build_id>`. The build id must be a
//! stable deployment identifier: deriving it from wall-clock time makes
//! every process start a distinct "current" version, so activation would
//! purge the previous start's cache and offline delivery never survives a
//! restart.

use crate::error::CacheError;

/// Identity of one cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheVersion {
    prefix: String,
    build_id: String,
}

impl CacheVersion {
    /// Create a version from an explicit, stable build identifier.
    pub fn new(prefix: impl Into<String>, build_id: impl Into<String>) -> Result<Self, CacheError> {
        let prefix = prefix.into();
        let build_id = build_id.into();
        if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
            return Err(CacheError::Manifest(format!(
                "invalid cache prefix: {prefix:?}"
            )));
        }
        if build_id.is_empty() || build_id.chars().any(char::is_whitespace) {
            return Err(CacheError::Manifest(format!(
                "invalid build id: {build_id:?}"
            )));
        }
        Ok(Self { prefix, build_id })
    }

    /// Convenience constructor using this library's crate version as the
    /// build id. Embedders shipping their own assets should prefer
    /// [`new`](Self::new) with their deployment's identifier.
    pub fn from_crate_version(prefix: impl Into<String>) -> Result<Self, CacheError> {
        Self::new(prefix, env!("CARGO_PKG_VERSION"))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// The generation name: `<prefix>-v<build_id>`.
    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.prefix, self.build_id)
    }

    /// Whether `name` denotes this exact generation.
    pub fn matches(&self, name: &str) -> bool {
        name == self.cache_name()
    }
}

impl std::fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cache_name())
    }
}
