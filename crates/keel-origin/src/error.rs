//! Error types for the origin handler.

use thiserror::Error;

/// Errors surfaced while answering an origin request.
#[derive(Debug, Error)]
pub enum OriginError {
    /// Base template could not be read or prepared.
    #[error("Template error: {0}")]
    Template(String),

    /// No render entry point exists in the build output.
    #[error("Render entry point not found")]
    EntryNotFound,

    /// Response sink misuse or transport failure.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
