//! Sync engine error types
//!
//! Three families reach the UI layer:
//! - transport failures: recoverable, shown as a non-fatal notice, prior state kept;
//! - precondition failures (no session): fatal to the view, the host redirects to sign-in;
//! - validation refusals: local input rejected before it reaches the transport.
//!
//! Protocol anomalies (duplicate message ids, presence for unknown users) are
//! absorbed by the store and tracker and never become errors.

use std::fmt;

use lobby_core::{DomainError, TransportError};
use serde::Serialize;

use crate::config::ConfigError;

/// Network-facing operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FetchMessages,
    FetchProfiles,
    SendMessage,
    SubscribeMessages,
    JoinPresence,
    PublishPresence,
}

impl Operation {
    /// Notice title shown to the user
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FetchMessages => "Error loading messages",
            Self::FetchProfiles => "Error loading profiles",
            Self::SendMessage => "Failed to send message",
            Self::SubscribeMessages => "Live updates unavailable",
            Self::JoinPresence => "Presence unavailable",
            Self::PublishPresence => "Failed to update status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchMessages => "fetch_messages",
            Self::FetchProfiles => "fetch_profiles",
            Self::SendMessage => "send_message",
            Self::SubscribeMessages => "subscribe_messages",
            Self::JoinPresence => "join_presence",
            Self::PublishPresence => "publish_presence",
        };
        f.write_str(name)
    }
}

/// Broad error family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Precondition,
    Validation,
    Configuration,
    Internal,
}

/// Sync engine error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{operation} failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("No active session")]
    NoSession,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync controller stopped")]
    Stopped,

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl SyncError {
    /// Wrap a transport failure of `operation`
    #[must_use]
    pub fn transport(operation: Operation, source: TransportError) -> Self {
        Self::Transport { operation, source }
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// Error family
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::NoSession => ErrorKind::Precondition,
            Self::Domain(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Stopped | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the current view cannot continue
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoSession | Self::Config(_) | Self::Stopped)
    }

    /// Get error code for notices
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { source, .. } => match source {
                TransportError::Unavailable(_) => "TRANSPORT_UNAVAILABLE",
                TransportError::Rejected(_) => "TRANSPORT_REJECTED",
                TransportError::Timeout => "TRANSPORT_TIMEOUT",
                TransportError::Closed => "TRANSPORT_CLOSED",
            },
            Self::NoSession => "NO_SESSION",
            Self::Domain(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Stopped => "CONTROLLER_STOPPED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The failing operation, for transport errors
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

/// User-visible, non-fatal notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub code: String,
    pub title: String,
    pub message: String,
}

impl From<&SyncError> for Notice {
    fn from(err: &SyncError) -> Self {
        let (title, message) = match err {
            SyncError::Transport { operation, source } => {
                (operation.title().to_string(), source.to_string())
            }
            SyncError::Domain(e) => ("Message not sent".to_string(), e.to_string()),
            other => ("Something went wrong".to_string(), other.to_string()),
        };

        Self {
            code: err.code().to_string(),
            title,
            message,
        }
    }
}

impl From<SyncError> for Notice {
    fn from(err: SyncError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
