//! Asset storage: cache generations and their entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::CacheError;

/// A stored response: enough to replay it to a caller later.
#[derive(Debug, Clone)]
pub struct CachedAsset {
    /// URL the body was actually fetched from.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

/// Storage seam for cache generations.
///
/// A generation is a named set of key → asset entries; invalidation only
/// ever removes whole generations.
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Create the generation if absent.
    async fn open_generation(&self, name: &str) -> Result<(), CacheError>;

    /// Store an asset under `key`, creating the generation if needed
    /// (mirrors open-then-put semantics). Overwrites an existing entry.
    async fn put(&self, generation: &str, key: &str, asset: CachedAsset)
        -> Result<(), CacheError>;

    /// Look up `key` in `generation`.
    async fn get(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>, CacheError>;

    /// Names of all generations currently present.
    async fn list_generations(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a whole generation. Returns whether it existed.
    async fn delete_generation(&self, name: &str) -> Result<bool, CacheError>;

    /// Number of entries in a generation, if it exists.
    async fn entry_count(&self, generation: &str) -> Result<Option<usize>, CacheError>;
}

/// In-memory store over a concurrent map of generations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: DashMap<String, HashMap<String, CachedAsset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AssetStore for MemoryStore {
    async fn open_generation(&self, name: &str) -> Result<(), CacheError> {
        self.generations.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn put(
        &self,
        generation: &str,
        key: &str,
        asset: CachedAsset,
    ) -> Result<(), CacheError> {
        self.generations
            .entry(generation.to_string())
            .or_default()
            .insert(key.to_string(), asset);
        Ok(())
    }

    async fn get(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>, CacheError> {
        Ok(self
            .generations
            .get(generation)
            .and_then(|entries| entries.get(key).cloned()))
    }

    async fn list_generations(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .generations
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.generations.remove(name).is_some())
    }

    async fn entry_count(&self, generation: &str) -> Result<Option<usize>, CacheError> {
        Ok(self.generations.get(generation).map(|entries| entries.len()))
    }
}
