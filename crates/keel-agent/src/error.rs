//! Error types for the caching agent.

use thiserror::Error;

use crate::network::NetworkError;

/// Errors surfaced by the caching agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The network could not produce a response.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The persistent cache store failed.
    #[error("Cache store error: {0}")]
    Store(String),

    /// The precached offline document is missing from the static generation.
    #[error("Offline fallback document missing")]
    OfflineDocMissing,
}
