//! Errors reported by the collaborators behind the ports

use thiserror::Error;

/// Failure of a network-facing collaborator call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Channel closed")]
    Closed,
}

impl TransportError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a rejected error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// Result type for collaborator calls
pub type TransportResult<T> = Result<T, TransportError>;
