//! Authenticated session as seen by the sync engine

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Active session of the local user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
