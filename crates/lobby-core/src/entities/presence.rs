//! Presence record - what one client announces about its user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Ephemeral presence record
///
/// Exists only while the owning client keeps publishing it. Every snapshot
/// replaces the previous set of records wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub display_name: String,
    pub announced_at: DateTime<Utc>,
    pub typing: bool,
}

impl PresenceRecord {
    /// Create a record announced now
    pub fn new(user_id: UserId, display_name: impl Into<String>, typing: bool) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            announced_at: Utc::now(),
            typing,
        }
    }
}
