//! Domain errors - local rule violations

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Message is empty")]
    ContentEmpty,

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },
}

impl DomainError {
    /// Get an error code string for notices
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContentEmpty => "CONTENT_EMPTY",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
        }
    }
}
