//! Versioned cache generations.

use std::sync::Arc;

use tracing::{info, warn};

use keel_core::{CacheClass, VersionToken};

use crate::network::NetworkClient;
use crate::store::CacheStore;
use crate::types::FetchRequest;
use crate::AgentError;

/// Fixed list of URLs precached into the static generation at install.
#[derive(Debug, Clone)]
pub struct PrecacheList {
    urls: Vec<String>,
}

impl PrecacheList {
    /// Create a precache list from URLs.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Default shell set: the app shell, the offline document, the web app
    /// manifest and its icons.
    pub fn shell() -> Self {
        Self::new([
            "/",
            "/offline.html",
            "/site.webmanifest",
            "/icons/icon-192.png",
            "/icons/icon-512.png",
        ])
    }

    /// Add a URL.
    pub fn with(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Whether a path is a member of the list.
    pub fn contains(&self, path: &str) -> bool {
        self.urls.iter().any(|u| u == path)
    }

    /// The precached URLs.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

impl Default for PrecacheList {
    fn default() -> Self {
        Self::shell()
    }
}

/// What activation cleaned up.
#[derive(Debug, Clone, Default)]
pub struct ActivationReport {
    /// Names of the prior-version caches that were deleted.
    pub deleted: Vec<String>,
}

/// Owns the named, versioned cache partitions.
///
/// All generation names are derived from one [`VersionToken`], so install
/// and the activation cleanup predicate can never disagree about which
/// caches are current.
pub struct GenerationManager {
    token: VersionToken,
    store: Arc<dyn CacheStore>,
}

impl GenerationManager {
    /// Create a manager for the given deploy version.
    pub fn new(token: VersionToken, store: Arc<dyn CacheStore>) -> Self {
        Self { token, store }
    }

    /// The deploy version token.
    pub fn token(&self) -> &VersionToken {
        &self.token
    }

    /// Current generation name for a class.
    pub fn name(&self, class: CacheClass) -> String {
        self.token.generation_name(class)
    }

    /// Install step: populate the static generation from the precache list
    /// and open the immutable generation empty.
    ///
    /// Individual precache fetch failures are logged and skipped; a partial
    /// static generation beats leaving the previous version active forever.
    pub async fn install(
        &self,
        network: &dyn NetworkClient,
        precache: &PrecacheList,
    ) -> Result<(), AgentError> {
        let static_name = self.name(CacheClass::Static);
        self.store.open(&static_name).await?;

        for url in precache.urls() {
            let request = FetchRequest::get(url.clone());
            match network.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    self.store.put(&static_name, url, response).await?;
                }
                Ok(response) => {
                    warn!(
                        url = %url,
                        status = %response.status,
                        "precache fetch returned uncacheable status, skipping"
                    );
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "precache fetch failed, skipping");
                }
            }
        }

        self.store.open(&self.name(CacheClass::Immutable)).await?;
        info!(version = %self.token, "cache generations installed");
        Ok(())
    }

    /// Activation cleanup: delete every stored cache this version does not
    /// own. This is the system's only eviction mechanism across deploys.
    pub async fn activate(&self) -> Result<ActivationReport, AgentError> {
        let mut report = ActivationReport::default();
        for name in self.store.list_caches().await? {
            if !self.token.owns(&name) && self.store.delete_cache(&name).await? {
                report.deleted.push(name);
            }
        }
        if !report.deleted.is_empty() {
            info!(
                version = %self.token,
                deleted = report.deleted.len(),
                "stale cache generations removed"
            );
        }
        Ok(report)
    }
}
