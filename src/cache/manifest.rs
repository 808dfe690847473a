//! The asset manifest: an ordered, fixed list of resource URLs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CacheError;

/// Ordered sequence of resource URLs to install, fixed at build time.
///
/// Entries are either origin-relative paths (`/build/bundle.js`) or
/// absolute URLs (`https://cdn.example.com/lib.js`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheManifest {
    urls: Vec<String>,
}

impl CacheManifest {
    /// Build a manifest, validating every entry.
    pub fn new(urls: Vec<String>) -> Result<Self, CacheError> {
        for entry in &urls {
            if entry.starts_with('/') {
                continue;
            }
            Url::parse(entry).map_err(|e| CacheError::InvalidUrl {
                url: entry.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self { urls })
    }

    /// Parse a manifest from its JSON form: an array of URL strings.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        let manifest: CacheManifest =
            serde_json::from_str(json).map_err(|e| CacheError::Manifest(e.to_string()))?;
        Self::new(manifest.urls)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.urls.iter()
    }
}
