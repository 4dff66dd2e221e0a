//! Network seam for the caching agent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::{FetchRequest, FetchResponse};

/// Failure reaching the network.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// The request could not be completed.
    #[error("Network unreachable: {0}")]
    Unreachable(String),

    /// The bounded wait elapsed before a response arrived.
    #[error("Network timed out after {0:?}")]
    Timeout(Duration),
}

/// Outbound fetch capability.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError>;
}

/// Scripted network for tests and local development.
///
/// Serves canned responses by exact URL, optionally after a fixed delay,
/// and reports everything else unreachable. A shared offline switch lets a
/// test cut the network mid-scenario.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: RwLock<HashMap<String, FetchResponse>>,
    fetches: RwLock<HashMap<String, usize>>,
    delay: Option<Duration>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to every request only after this delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register a canned response for a URL.
    pub async fn insert(&self, url: impl Into<String>, response: FetchResponse) {
        self.routes.write().await.insert(url.into(), response);
    }

    /// Cut or restore the network.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// How many fetches were attempted for a URL (including failed ones).
    pub async fn fetch_count(&self, url: &str) -> usize {
        self.fetches.read().await.get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl NetworkClient for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        *self
            .fetches
            .write()
            .await
            .entry(request.url.clone())
            .or_insert(0) += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable("offline".to_string()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.routes
            .read()
            .await
            .get(&request.url)
            .cloned()
            .ok_or_else(|| NetworkError::Unreachable(format!("no route for {}", request.url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_routes_and_counts() {
        let network = ScriptedNetwork::new();
        network.insert("/a", FetchResponse::ok("a")).await;

        let request = FetchRequest::get("/a");
        assert!(network.fetch(&request).await.is_ok());
        assert!(network.fetch(&FetchRequest::get("/b")).await.is_err());
        assert_eq!(network.fetch_count("/a").await, 1);
        assert_eq!(network.fetch_count("/b").await, 1);
    }

    #[tokio::test]
    async fn test_offline_switch() {
        let network = ScriptedNetwork::new();
        network.insert("/a", FetchResponse::ok("a")).await;
        network.set_offline(true);

        let result = network.fetch(&FetchRequest::get("/a")).await;

        assert!(matches!(result, Err(NetworkError::Unreachable(_))));
    }
}
