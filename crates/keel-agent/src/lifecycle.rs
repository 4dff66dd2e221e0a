//! Lifecycle state machine for the caching agent.

use std::sync::Arc;

use http::Method;
use tracing::{debug, info};

use keel_core::{CacheClass, VersionToken};

use crate::fallback::OfflineFallback;
use crate::generation::{ActivationReport, GenerationManager, PrecacheList};
use crate::network::NetworkClient;
use crate::store::CacheStore;
use crate::strategy::{classify, RequestClass, Strategies, StrategyConfig};
use crate::types::{FetchEvent, FetchOutcome};
use crate::AgentError;

/// Lifecycle phases, driven by platform events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentPhase {
    /// Registered but not yet installed.
    #[default]
    Idle,
    /// Install finished; a previous version may still control clients.
    Installed,
    /// This version controls all clients.
    Active,
}

/// External control messages accepted by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMessage {
    /// Force immediate activation of a newly installed generation.
    SkipWaiting,
}

/// Capabilities of the hosting platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformCapabilities {
    /// Whether navigation preload can be enabled.
    pub navigation_preload: bool,
}

/// The browser-resident caching agent.
///
/// One instance per registered version; the phase advances monotonically
/// Idle → Installed → Active as the platform delivers lifecycle events.
pub struct CachingAgent {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn NetworkClient>,
    generations: GenerationManager,
    strategies: Strategies,
    precache: PrecacheList,
    offline: OfflineFallback,
    phase: AgentPhase,
    skip_waiting: bool,
    preload_enabled: bool,
    clients_claimed: bool,
}

impl CachingAgent {
    /// Create an agent for the given deploy version.
    pub fn new(
        token: VersionToken,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn NetworkClient>,
    ) -> Self {
        let generations = GenerationManager::new(token, Arc::clone(&store));
        let strategies = Strategies::new(
            Arc::clone(&store),
            Arc::clone(&network),
            StrategyConfig::default(),
        );
        Self {
            store,
            network,
            generations,
            strategies,
            precache: PrecacheList::shell(),
            offline: OfflineFallback::default(),
            phase: AgentPhase::Idle,
            skip_waiting: false,
            preload_enabled: false,
            clients_claimed: false,
        }
    }

    /// Replace the precache list.
    pub fn with_precache(mut self, precache: PrecacheList) -> Self {
        self.precache = precache;
        self
    }

    /// Replace the offline fallback policy.
    pub fn with_offline(mut self, offline: OfflineFallback) -> Self {
        self.offline = offline;
        self
    }

    /// Replace the strategy tuning knobs.
    pub fn with_strategy_config(mut self, config: StrategyConfig) -> Self {
        self.strategies = Strategies::new(
            Arc::clone(&self.store),
            Arc::clone(&self.network),
            config,
        );
        self
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Whether this instance asked to supersede the previous one.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    /// Whether navigation preload was enabled during activation.
    pub fn preload_enabled(&self) -> bool {
        self.preload_enabled
    }

    /// Whether this instance claimed all open clients.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    /// Install: precache the shell set and signal readiness to supersede
    /// any previously active instance without waiting for clients to close.
    pub async fn handle_install(&mut self) -> Result<(), AgentError> {
        self.generations
            .install(self.network.as_ref(), &self.precache)
            .await?;
        self.skip_waiting = true;
        self.phase = AgentPhase::Installed;
        Ok(())
    }

    /// Handle the single external control message.
    pub fn handle_message(&mut self, message: AgentMessage) {
        match message {
            AgentMessage::SkipWaiting => {
                info!(version = %self.generations.token(), "skip-waiting requested");
                self.skip_waiting = true;
            }
        }
    }

    /// Activate: enable preload where supported, evict prior-version
    /// generations, and claim all open clients. After this no two versions
    /// run concurrently.
    pub async fn handle_activate(
        &mut self,
        platform: PlatformCapabilities,
    ) -> Result<ActivationReport, AgentError> {
        if platform.navigation_preload {
            self.preload_enabled = true;
        }
        let report = self.generations.activate().await?;
        self.clients_claimed = true;
        self.phase = AgentPhase::Active;
        Ok(report)
    }

    /// Fetch interception. Non-GET requests pass through untouched.
    pub async fn handle_fetch(
        &self,
        event: FetchEvent,
    ) -> Result<Option<FetchOutcome>, AgentError> {
        if event.request.method != Method::GET {
            return Ok(None);
        }

        let class = classify(&event.request, &self.precache);
        debug!(url = %event.request.url, class = ?class, "dispatching fetch");

        let outcome = match class {
            RequestClass::Navigation => self.handle_navigation(event).await?,
            RequestClass::Api => {
                let bound = Some(self.strategies.config().api_timeout);
                self.strategies
                    .network_first(
                        self.generations.name(CacheClass::Dynamic),
                        &event.request,
                        bound,
                    )
                    .await?
            }
            RequestClass::Immutable => {
                self.strategies
                    .stale_while_revalidate(
                        self.generations.name(CacheClass::Immutable),
                        &event.request,
                    )
                    .await?
            }
            RequestClass::Precached => {
                self.strategies
                    .stale_while_revalidate(
                        self.generations.name(CacheClass::Static),
                        &event.request,
                    )
                    .await?
            }
            RequestClass::Dynamic => {
                self.strategies
                    .stale_while_revalidate(
                        self.generations.name(CacheClass::Dynamic),
                        &event.request,
                    )
                    .await?
            }
        };
        Ok(Some(outcome))
    }

    /// Navigation dispatch: preload, then network-first, then the offline
    /// fallback when both the network and the dynamic cache come up empty.
    async fn handle_navigation(&self, event: FetchEvent) -> Result<FetchOutcome, AgentError> {
        let dynamic = self.generations.name(CacheClass::Dynamic);
        let request = &event.request;

        if let Some(preload) = event.preload {
            if preload.is_cacheable() {
                self.store.put(&dynamic, &request.url, preload.clone()).await?;
            }
            return Ok(FetchOutcome::immediate(preload));
        }

        match self.strategies.network_first(dynamic, request, None).await {
            Ok(outcome) => Ok(outcome),
            Err(AgentError::Network(err)) => {
                debug!(url = %request.url, error = %err, "navigation offline, serving fallback");
                let static_name = self.generations.name(CacheClass::Static);
                let doc = self.offline.serve(self.store.as_ref(), &static_name).await?;
                Ok(FetchOutcome::immediate(doc))
            }
            Err(other) => Err(other),
        }
    }
}
