//! Offline fallback policy.

use crate::store::CacheStore;
use crate::types::FetchResponse;
use crate::AgentError;

/// Last-resort response for navigations.
///
/// Triggered only when a navigation's network attempt failed and no dynamic
/// entry exists for that exact URL. This is the only path permitted to
/// answer a URL that was never cached under that URL.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
    offline_url: String,
}

impl OfflineFallback {
    /// Create a policy serving the given precached document.
    pub fn new(offline_url: impl Into<String>) -> Self {
        Self {
            offline_url: offline_url.into(),
        }
    }

    /// URL of the offline document inside the static generation.
    pub fn offline_url(&self) -> &str {
        &self.offline_url
    }

    /// Fetch the offline document from the static generation.
    pub async fn serve(
        &self,
        store: &dyn CacheStore,
        static_cache: &str,
    ) -> Result<FetchResponse, AgentError> {
        store
            .get(static_cache, &self.offline_url)
            .await?
            .ok_or(AgentError::OfflineDocMissing)
    }
}

impl Default for OfflineFallback {
    fn default() -> Self {
        Self::new("/offline.html")
    }
}
