//! The offline cache manager: install, activate, and fetch interception.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::fetcher::{FetchedResource, ResourceFetcher};
use crate::cache::manifest::CacheManifest;
use crate::cache::store::{AssetStore, CachedAsset};
use crate::cache::version::CacheVersion;
use crate::error::CacheError;

/// Manager lifecycle, mirroring the install → activate flow: a fresh
/// manager is `Idle`, a successful install leaves it `WaitingToActivate`,
/// and `activate` moves it to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    Idle,
    Installing,
    WaitingToActivate,
    Active,
}

/// Cache manager configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// The application's own origin; relative manifest entries and CDN
    /// rewrites resolve against it.
    pub origin: Url,
    /// Host whose URLs are rewritten to origin-relative cache keys.
    pub cdn_host: Option<String>,
    /// Identity of the current cache generation.
    pub version: CacheVersion,
    /// Assets installed into the generation.
    pub manifest: CacheManifest,
}

/// Serving-path counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
}

/// What `activate` removed and kept.
#[derive(Debug, Clone)]
pub struct ActivateReport {
    pub retained: String,
    pub deleted: Vec<String>,
}

/// Offline cache manager.
///
/// Serves resource requests from a versioned cache generation, falling
/// back to the network on a miss and opportunistically caching
/// successful same-origin responses. Invalidation is whole-generation:
/// `activate` purges every generation other than the current one.
pub struct OfflineCacheManager {
    config: CacheConfig,
    store: Arc<dyn AssetStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    phase: Mutex<CachePhase>,
    hits: AtomicU64,
    misses: AtomicU64,
    network_fetches: AtomicU64,
}

impl OfflineCacheManager {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn AssetStore>,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Result<Self, CacheError> {
        if config.origin.host_str().is_none() {
            return Err(CacheError::InvalidUrl {
                url: config.origin.to_string(),
                reason: "origin must have a host".to_string(),
            });
        }
        Ok(Self {
            config,
            store,
            fetcher,
            phase: Mutex::new(CachePhase::Idle),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            network_fetches: AtomicU64::new(0),
        })
    }

    pub fn phase(&self) -> CachePhase {
        *self.phase.lock()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
        }
    }

    /// Pre-fetch every manifest URL into the current generation.
    ///
    /// Any failed fetch or store fails the whole install: a partially
    /// populated shell is never reported ready.
    pub async fn install(&self) -> Result<(), CacheError> {
        let generation = self.config.version.cache_name();
        info!(version = %self.config.version, "installing cache generation");
        *self.phase.lock() = CachePhase::Installing;

        self.store.open_generation(&generation).await?;

        for entry in self.config.manifest.iter() {
            let absolute = self.resolve(entry)?;
            let key = self.cache_key(&absolute).to_string();

            let resource = self.fetcher.fetch(&absolute).await.map_err(|e| {
                CacheError::InstallFailed {
                    url: entry.clone(),
                    source: Box::new(e),
                }
            })?;
            if !resource.is_success() {
                return Err(CacheError::InstallFailed {
                    url: entry.clone(),
                    source: Box::new(CacheError::Fetch(format!(
                        "unexpected status {}",
                        resource.status
                    ))),
                });
            }

            self.store
                .put(&generation, &key, to_asset(&resource))
                .await
                .map_err(|e| CacheError::InstallFailed {
                    url: entry.clone(),
                    source: Box::new(e),
                })?;
            debug!(url = entry.as_str(), key = key.as_str(), "installed");
        }

        *self.phase.lock() = CachePhase::WaitingToActivate;
        info!(
            version = %self.config.version,
            assets = self.config.manifest.len(),
            "cache generation installed"
        );
        Ok(())
    }

    /// Purge every generation other than the current one.
    pub async fn activate(&self) -> Result<ActivateReport, CacheError> {
        let current = self.config.version.cache_name();
        let names = self.store.list_generations().await?;
        if !names.iter().any(|name| name == &current) {
            return Err(CacheError::NotInstalled);
        }

        let mut deleted = Vec::new();
        for name in names {
            if name == current {
                continue;
            }
            info!(generation = name.as_str(), "deleting stale cache generation");
            if self.store.delete_generation(&name).await? {
                deleted.push(name);
            }
        }

        *self.phase.lock() = CachePhase::Active;
        Ok(ActivateReport {
            retained: current,
            deleted,
        })
    }

    /// Serve one resource request.
    ///
    /// Cache hit → the stored asset, verbatim. Miss → a live network
    /// fetch of the (possibly rewritten) URL; successful same-origin
    /// responses are copied into the cache without delaying the reply,
    /// and a failed copy is logged, never surfaced. A network failure on
    /// a miss propagates to the caller.
    pub async fn fetch(&self, url: &str) -> Result<FetchedResource, CacheError> {
        let absolute = self.resolve(url)?;
        let key_url = self.cache_key(&absolute);
        let key = key_url.to_string();
        let generation = self.config.version.cache_name();

        if let Some(asset) = self.store.get(&generation, &key).await? {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = key.as_str(), "cache hit");
            return Ok(asset.into());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
        debug!(key = key.as_str(), "cache miss");

        let resource = self.fetcher.fetch(&key_url).await?;
        if resource.is_success() && self.is_same_origin(&resource) {
            let store = self.store.clone();
            let asset = to_asset(&resource);
            tokio::spawn(async move {
                if let Err(e) = store.put(&generation, &key, asset).await {
                    warn!(key = key.as_str(), error = %e, "cache write failed");
                }
            });
        }
        Ok(resource)
    }

    /// Resolve a manifest entry or request URL to an absolute URL.
    fn resolve(&self, url: &str) -> Result<Url, CacheError> {
        let result = if url.starts_with('/') {
            self.config.origin.join(url)
        } else {
            Url::parse(url)
        };
        result.map_err(|e| CacheError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Compute the cache key: CDN-host URLs map to the equivalent path on
    /// our own origin so both spellings share one key space.
    fn cache_key(&self, url: &Url) -> Url {
        match (&self.config.cdn_host, url.host_str()) {
            (Some(cdn), Some(host)) if host == cdn => {
                let mut rewritten = self.config.origin.clone();
                rewritten.set_path(url.path());
                rewritten.set_query(None);
                rewritten.set_fragment(None);
                rewritten
            }
            _ => url.clone(),
        }
    }

    /// Whether the response came back from our own origin (the analogue
    /// of a "basic" response: redirects elsewhere disqualify it).
    fn is_same_origin(&self, resource: &FetchedResource) -> bool {
        Url::parse(&resource.url)
            .map(|u| u.origin() == self.config.origin.origin())
            .unwrap_or(false)
    }
}

fn to_asset(resource: &FetchedResource) -> CachedAsset {
    CachedAsset {
        url: resource.url.clone(),
        status: resource.status,
        content_type: resource.content_type.clone(),
        body: resource.body.clone(),
        stored_at: Utc::now(),
    }
}

impl From<CachedAsset> for FetchedResource {
    fn from(asset: CachedAsset) -> Self {
        FetchedResource {
            url: asset.url,
            status: asset.status,
            content_type: asset.content_type,
            body: asset.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use dashmap::DashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Fetcher double: a URL → response table plus a call counter.
    struct FakeFetcher {
        responses: DashMap<String, FetchedResource>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: DashMap::new(),
                calls: AtomicUsize::new(0),
            })
        }

        fn serve(&self, url: &str, status: u16, body: &str) {
            self.responses.insert(
                url.to_string(),
                FetchedResource {
                    url: url.to_string(),
                    status,
                    content_type: Some("text/plain".to_string()),
                    body: body.as_bytes().to_vec(),
                },
            );
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ResourceFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedResource, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url.as_str())
                .map(|r| r.value().clone())
                .ok_or_else(|| CacheError::Fetch(format!("connection refused: {url}")))
        }
    }

    const ORIGIN: &str = "https://app.example.com";
    const CDN: &str = "cdn.example.com";

    fn manager_with(
        manifest: Vec<&str>,
        build_id: &str,
        store: Arc<MemoryStore>,
        fetcher: Arc<FakeFetcher>,
    ) -> OfflineCacheManager {
        let config = CacheConfig {
            origin: Url::parse(ORIGIN).unwrap(),
            cdn_host: Some(CDN.to_string()),
            version: CacheVersion::new("shell", build_id).unwrap(),
            manifest: CacheManifest::new(manifest.into_iter().map(String::from).collect())
                .unwrap(),
        };
        OfflineCacheManager::new(config, store, fetcher).unwrap()
    }

    async fn settle() {
        // Let fire-and-forget cache writes land.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_install_populates_every_manifest_url() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/a.js", 200, "aaa");
        fetcher.serve("https://app.example.com/b.css", 200, "bbb");

        let manager = manager_with(vec!["/a.js", "/b.css"], "1", store.clone(), fetcher);
        assert_eq!(manager.phase(), CachePhase::Idle);
        manager.install().await.unwrap();
        assert_eq!(manager.phase(), CachePhase::WaitingToActivate);

        for key in ["https://app.example.com/a.js", "https://app.example.com/b.css"] {
            assert!(store.get("shell-v1", key).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_install_fails_on_unreachable_asset() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/a.js", 200, "aaa");

        let manager = manager_with(vec!["/a.js", "/missing.js"], "1", store, fetcher);
        let err = manager.install().await.unwrap_err();
        match err {
            CacheError::InstallFailed { url, .. } => assert_eq!(url, "/missing.js"),
            other => panic!("Expected InstallFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_install_fails_on_error_status() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/a.js", 500, "oops");

        let manager = manager_with(vec!["/a.js"], "1", store, fetcher);
        assert!(matches!(
            manager.install().await,
            Err(CacheError::InstallFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_stores_cdn_assets_under_origin_key() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://cdn.example.com/lib/interp.js", 200, "lib");

        let manager = manager_with(
            vec!["https://cdn.example.com/lib/interp.js"],
            "1",
            store.clone(),
            fetcher,
        );
        manager.install().await.unwrap();

        // Stored under the rewritten origin-relative key.
        assert!(store
            .get("shell-v1", "https://app.example.com/lib/interp.js")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_activate_purges_stale_generations() {
        let store = Arc::new(MemoryStore::new());
        store.open_generation("shell-v0").await.unwrap();
        store.open_generation("other-v9").await.unwrap();
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/a.js", 200, "aaa");

        let manager = manager_with(vec!["/a.js"], "1", store.clone(), fetcher);
        manager.install().await.unwrap();
        let report = manager.activate().await.unwrap();

        assert_eq!(manager.phase(), CachePhase::Active);
        assert_eq!(report.retained, "shell-v1");
        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["other-v9", "shell-v0"]);
        assert_eq!(store.list_generations().await.unwrap(), vec!["shell-v1"]);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(vec!["/a.js"], "1", store, FakeFetcher::new());
        assert!(matches!(
            manager.activate().await,
            Err(CacheError::NotInstalled)
        ));
    }

    #[tokio::test]
    async fn test_cached_fetch_never_touches_network() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/a.js", 200, "aaa");

        let manager = manager_with(vec!["/a.js"], "1", store, fetcher.clone());
        manager.install().await.unwrap();
        let installed_calls = fetcher.calls();

        let resource = manager.fetch("/a.js").await.unwrap();
        assert_eq!(resource.body, b"aaa");
        assert_eq!(fetcher.calls(), installed_calls);
        assert_eq!(manager.stats().hits, 1);
        assert_eq!(manager.stats().network_fetches, 0);
    }

    #[tokio::test]
    async fn test_cdn_url_resolves_to_cached_equivalent() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/lib/interp.js", 200, "lib");

        let manager = manager_with(vec!["/lib/interp.js"], "1", store, fetcher.clone());
        manager.install().await.unwrap();
        let installed_calls = fetcher.calls();

        let resource = manager
            .fetch("https://cdn.example.com/lib/interp.js")
            .await
            .unwrap();
        assert_eq!(resource.body, b"lib");
        assert_eq!(fetcher.calls(), installed_calls);
    }

    #[tokio::test]
    async fn test_miss_fetches_network_and_populates_cache() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/late.js", 200, "late");

        let manager = manager_with(vec![], "1", store.clone(), fetcher.clone());
        let resource = manager.fetch("/late.js").await.unwrap();
        assert_eq!(resource.body, b"late");
        assert_eq!(manager.stats().misses, 1);
        settle().await;

        assert!(store
            .get("shell-v1", "https://app.example.com/late.js")
            .await
            .unwrap()
            .is_some());

        // Second fetch is a hit.
        manager.fetch("/late.js").await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_status_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://app.example.com/gone.js", 404, "nope");

        let manager = manager_with(vec![], "1", store.clone(), fetcher);
        let resource = manager.fetch("/gone.js").await.unwrap();
        assert_eq!(resource.status, 404);
        settle().await;

        assert!(store
            .get("shell-v1", "https://app.example.com/gone.js")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cross_origin_response_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = FakeFetcher::new();
        fetcher.serve("https://elsewhere.example.net/x.js", 200, "x");

        let manager = manager_with(vec![], "1", store.clone(), fetcher);
        let resource = manager
            .fetch("https://elsewhere.example.net/x.js")
            .await
            .unwrap();
        assert_eq!(resource.body, b"x");
        settle().await;

        assert!(store
            .get("shell-v1", "https://elsewhere.example.net/x.js")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_network_failure_propagates_on_miss() {
        let manager = manager_with(
            vec![],
            "1",
            Arc::new(MemoryStore::new()),
            FakeFetcher::new(),
        );
        assert!(matches!(
            manager.fetch("/unreachable.js").await,
            Err(CacheError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_key_drops_query_on_rewrite_only() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(vec![], "1", store, FakeFetcher::new());

        let cdn = Url::parse("https://cdn.example.com/lib.js?v=3").unwrap();
        assert_eq!(
            manager.cache_key(&cdn).as_str(),
            "https://app.example.com/lib.js"
        );

        let own = Url::parse("https://app.example.com/page?q=1").unwrap();
        assert_eq!(manager.cache_key(&own).as_str(), "https://app.example.com/page?q=1");
    }
}
