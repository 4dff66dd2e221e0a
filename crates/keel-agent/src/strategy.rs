//! Request classification and caching strategies.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::generation::PrecacheList;
use crate::network::{NetworkClient, NetworkError};
use crate::store::CacheStore;
use crate::types::{FetchOutcome, FetchRequest};
use crate::AgentError;

/// Path prefixes classified as API traffic.
const API_PREFIXES: [&str; 2] = ["/api/", "/rpc/"];

/// Long-lived font extensions classified as immutable.
const IMMUTABLE_EXTENSIONS: [&str; 2] = [".woff", ".woff2"];

/// Request classes, in dispatch priority order; first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Top-level document navigation.
    Navigation,
    /// API-shaped path: freshness matters more than availability.
    Api,
    /// Content-addressed or long-TTL asset.
    Immutable,
    /// Member of the precache list.
    Precached,
    /// Everything else.
    Dynamic,
}

/// Classify a request.
pub fn classify(request: &FetchRequest, precache: &PrecacheList) -> RequestClass {
    if request.is_navigation() {
        return RequestClass::Navigation;
    }
    let path = request.path();
    if API_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return RequestClass::Api;
    }
    if path.starts_with("/assets/") || IMMUTABLE_EXTENSIONS.iter().any(|e| path.ends_with(e)) {
        return RequestClass::Immutable;
    }
    if precache.contains(path) {
        return RequestClass::Precached;
    }
    RequestClass::Dynamic
}

/// Strategy tuning knobs.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Bounded wait for API-class network-first fetches.
    pub api_timeout: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(3),
        }
    }
}

impl StrategyConfig {
    /// Set the API-class timeout.
    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }
}

/// Strategy executor bound to the store and the network.
pub struct Strategies {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn NetworkClient>,
    config: StrategyConfig,
}

impl Strategies {
    /// Create a strategy executor.
    pub fn new(
        store: Arc<dyn CacheStore>,
        network: Arc<dyn NetworkClient>,
        config: StrategyConfig,
    ) -> Self {
        Self {
            store,
            network,
            config,
        }
    }

    /// The tuning knobs.
    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Network-first: the cache never short-circuits a reachable network.
    ///
    /// On success a cacheable response is cloned into the cache and
    /// returned. The cache is consulted only when the fetch fails or the
    /// bounded wait elapses; a miss there propagates the network error.
    pub async fn network_first(
        &self,
        cache: String,
        request: &FetchRequest,
        bound: Option<Duration>,
    ) -> Result<FetchOutcome, AgentError> {
        let fetched = match bound {
            Some(limit) => match tokio::time::timeout(limit, self.network.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(NetworkError::Timeout(limit)),
            },
            None => self.network.fetch(request).await,
        };

        match fetched {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store.put(&cache, &request.url, response.clone()).await?;
                }
                Ok(FetchOutcome::immediate(response))
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "network-first falling back to cache");
                match self.store.get(&cache, &request.url).await? {
                    Some(cached) => Ok(FetchOutcome::immediate(cached)),
                    None => Err(err.into()),
                }
            }
        }
    }

    /// Stale-while-revalidate: a cached value is returned immediately and a
    /// refresh is always queued as deferred work; a failed refresh silently
    /// keeps the stale value. On a miss the network is awaited inline.
    pub async fn stale_while_revalidate(
        &self,
        cache: String,
        request: &FetchRequest,
    ) -> Result<FetchOutcome, AgentError> {
        match self.store.get(&cache, &request.url).await? {
            Some(cached) => {
                let store = Arc::clone(&self.store);
                let network = Arc::clone(&self.network);
                let request = request.clone();
                let deferred = async move {
                    match network.fetch(&request).await {
                        Ok(fresh) if fresh.is_cacheable() => {
                            if let Err(err) = store.put(&cache, &request.url, fresh).await {
                                warn!(
                                    url = %request.url,
                                    error = %err,
                                    "revalidation store write failed"
                                );
                            }
                        }
                        Ok(fresh) => {
                            debug!(
                                url = %request.url,
                                status = %fresh.status,
                                "revalidation response not cacheable, keeping stale entry"
                            );
                        }
                        Err(err) => {
                            debug!(
                                url = %request.url,
                                error = %err,
                                "revalidation fetch failed, keeping stale entry"
                            );
                        }
                    }
                }
                .boxed();
                Ok(FetchOutcome::with_deferred(cached, deferred))
            }
            None => {
                let response = self.network.fetch(request).await?;
                if response.is_cacheable() {
                    self.store.put(&cache, &request.url, response.clone()).await?;
                }
                Ok(FetchOutcome::immediate(response))
            }
        }
    }
}
