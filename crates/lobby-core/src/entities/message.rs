//! Message entity - an immutable chat message

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::DomainError;
use crate::value_objects::{MessageId, UserId};

/// Maximum message length in characters
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Message entity
///
/// Immutable once created. Messages are totally ordered by `(created_at, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new Message
    pub fn new(
        id: impl Into<MessageId>,
        author_id: impl Into<UserId>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            content: content.into(),
            created_at,
        }
    }

    /// Ordering key: `created_at` first, `id` only to break exact ties
    #[inline]
    pub fn ordering_key(&self) -> (DateTime<Utc>, &MessageId) {
        (self.created_at, &self.id)
    }

    /// Compare two messages by their ordering key
    #[inline]
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }

    /// Check if this message was written by `user_id`
    #[inline]
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.author_id == user_id
    }
}

/// Outgoing message content, trimmed and length-checked
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Draft {
    #[validate(length(min = 1, max = 5000, message = "Message must be 1-5000 characters"))]
    content: String,
}

impl Draft {
    /// Build a draft from raw input
    ///
    /// Surrounding whitespace is removed. Whitespace-only input is refused with
    /// `ContentEmpty`, input longer than [`MAX_CONTENT_CHARS`] with `ContentTooLong`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(DomainError::ContentEmpty);
        }

        let draft = Self {
            content: content.to_string(),
        };
        draft
            .validate()
            .map_err(|_| DomainError::ContentTooLong {
                max: MAX_CONTENT_CHARS,
            })?;
        Ok(draft)
    }

    /// Borrow the validated content
    pub fn content(&self) -> &str {
        &self.content
    }
}
