//! Profile entity - display identity of a user

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Display name used when a profile is missing
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// Profile entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

impl Profile {
    /// Create a new Profile
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            avatar_ref: None,
        }
    }

    /// Placeholder for a user whose profile is not (yet) known
    pub fn unknown(user_id: UserId) -> Self {
        Self::new(user_id, UNKNOWN_DISPLAY_NAME)
    }

    /// Check if this is the placeholder profile
    pub fn is_unknown(&self) -> bool {
        self.display_name == UNKNOWN_DISPLAY_NAME && self.avatar_ref.is_none()
    }

    /// Up to two leading characters of the display name, uppercased
    pub fn initials(&self) -> String {
        self.display_name.chars().take(2).flat_map(char::to_uppercase).collect()
    }
}
