//! Persistent cache store seam.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::FetchResponse;
use crate::AgentError;

/// Named-partition key/value store behind the caching agent.
///
/// Models the platform's persistent cache: named caches holding
/// (request URL, response) pairs. The platform serializes writes per key;
/// implementations only need to tolerate concurrent access to different
/// keys, and no cross-request locking is required because each fetch
/// handler writes entries keyed by its own request URL only.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry.
    async fn get(&self, cache: &str, url: &str) -> Result<Option<FetchResponse>, AgentError>;

    /// Store an entry, overwriting any existing one.
    async fn put(&self, cache: &str, url: &str, response: FetchResponse)
        -> Result<(), AgentError>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, cache: &str, url: &str) -> Result<bool, AgentError>;

    /// Create the named cache if it does not exist yet.
    async fn open(&self, cache: &str) -> Result<(), AgentError>;

    /// All stored cache names, sorted.
    async fn list_caches(&self) -> Result<Vec<String>, AgentError>;

    /// Delete an entire cache. Returns whether it existed.
    async fn delete_cache(&self, cache: &str) -> Result<bool, AgentError>;

    /// All entry keys in a cache, sorted.
    async fn keys(&self, cache: &str) -> Result<Vec<String>, AgentError>;
}

/// In-memory cache store for tests and local development.
#[derive(Default)]
pub struct MemoryCacheStore {
    caches: RwLock<HashMap<String, HashMap<String, FetchResponse>>>,
}

impl MemoryCacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a cache (0 if absent).
    pub async fn entry_count(&self, cache: &str) -> usize {
        self.caches
            .read()
            .await
            .get(cache)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, cache: &str, url: &str) -> Result<Option<FetchResponse>, AgentError> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .and_then(|entries| entries.get(url))
            .cloned())
    }

    async fn put(
        &self,
        cache: &str,
        url: &str,
        response: FetchResponse,
    ) -> Result<(), AgentError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response);
        Ok(())
    }

    async fn delete(&self, cache: &str, url: &str) -> Result<bool, AgentError> {
        Ok(self
            .caches
            .write()
            .await
            .get_mut(cache)
            .is_some_and(|entries| entries.remove(url).is_some()))
    }

    async fn open(&self, cache: &str) -> Result<(), AgentError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default();
        Ok(())
    }

    async fn list_caches(&self) -> Result<Vec<String>, AgentError> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, AgentError> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>, AgentError> {
        let mut keys: Vec<String> = self
            .caches
            .read()
            .await
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        Ok(keys)
    }
}
