//! Cache-path error types.

use thiserror::Error;

/// Errors raised by the offline cache manager.
///
/// Only install-time and lookup-miss failures surface to the caller;
/// opportunistic cache writes swallow their errors (logged, never thrown).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid manifest: {0}")]
    Manifest(String),
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Install failed for '{url}': {source}")]
    InstallFailed {
        url: String,
        #[source]
        source: Box<CacheError>,
    },
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Cache not installed")]
    NotInstalled,
}

impl From<reqwest::Error> for CacheError {
    fn from(e: reqwest::Error) -> Self {
        CacheError::Fetch(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        assert_eq!(
            CacheError::Manifest("empty".into()).to_string(),
            "Invalid manifest: empty"
        );
        assert_eq!(
            CacheError::InvalidUrl {
                url: "::".into(),
                reason: "bad host".into()
            }
            .to_string(),
            "Invalid URL '::': bad host"
        );
        assert_eq!(CacheError::NotInstalled.to_string(), "Cache not installed");
    }

    #[test]
    fn test_install_failed_wraps_source() {
        let err = CacheError::InstallFailed {
            url: "/a.js".into(),
            source: Box::new(CacheError::Fetch("connection refused".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a.js"));
        assert!(msg.contains("Install failed"));
    }
}
