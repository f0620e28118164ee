//! Presence tracker
//!
//! Derives the online set and the typing set from full-state presence
//! snapshots. Every snapshot replaces the previous view; the diff against the
//! old view is only used to arm and cancel typing expiry deadlines.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lobby_core::{PresenceRecord, UserId};
use tokio::time::Instant;

/// Typing grant for one remote user
#[derive(Debug, Clone)]
struct TypingGrant {
    display_name: String,
    /// `announced_at` of the record that armed the grant
    announced_at: DateTime<Utc>,
    expires_at: Instant,
}

/// What a tracker operation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceChange {
    pub online: bool,
    pub typing: bool,
}

impl PresenceChange {
    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.online && !self.typing
    }
}

/// Online and typing state of the room, as seen by one client
#[derive(Debug)]
pub struct PresenceTracker {
    self_id: UserId,
    expiry: Duration,
    /// Online users with the display name of their latest record
    online: HashMap<UserId, String>,
    typing: HashMap<UserId, TypingGrant>,
    /// `announced_at` of grants that ran out, while the record is still around
    expired: HashMap<UserId, DateTime<Utc>>,
}

impl PresenceTracker {
    /// Create a tracker for the local user `self_id`
    ///
    /// `expiry` is how long a `typing = true` record is trusted without refresh.
    pub fn new(self_id: UserId, expiry: Duration) -> Self {
        Self {
            self_id,
            expiry,
            online: HashMap::new(),
            typing: HashMap::new(),
            expired: HashMap::new(),
        }
    }

    /// Replace the view with `records`
    ///
    /// Several records for one user (several open clients) count as one online
    /// user, typing if any of them is typing.
    pub fn on_snapshot(&mut self, records: Vec<PresenceRecord>, now: Instant) -> PresenceChange {
        let mut online: HashMap<UserId, String> = HashMap::with_capacity(records.len());
        let mut typing_records: HashMap<UserId, PresenceRecord> = HashMap::new();

        for record in records {
            online.insert(record.user_id.clone(), record.display_name.clone());
            if record.typing && record.user_id != self.self_id {
                match typing_records.get(&record.user_id) {
                    Some(newest) if newest.announced_at >= record.announced_at => {}
                    _ => {
                        typing_records.insert(record.user_id.clone(), record);
                    }
                }
            }
        }

        let online_changed = online.len() != self.online.len()
            || online.keys().any(|id| !self.online.contains_key(id));
        self.online = online;

        let before: HashSet<UserId> = self.typing.keys().cloned().collect();

        // Absent users and explicit `typing = false` cancel immediately
        self.typing.retain(|id, _| typing_records.contains_key(id));
        self.expired.retain(|id, _| typing_records.contains_key(id));

        // Only a newer announcement (re)arms; a record repeated in later
        // snapshots keeps its original deadline and cannot revive after expiry
        for (user_id, record) in typing_records {
            let seen = self
                .typing
                .get(&user_id)
                .map(|grant| grant.announced_at)
                .or_else(|| self.expired.get(&user_id).copied());
            if seen.is_some_and(|seen| record.announced_at <= seen) {
                continue;
            }
            tracing::debug!(user_id = %user_id, "Typing armed");
            self.expired.remove(&user_id);
            self.typing.insert(
                user_id,
                TypingGrant {
                    display_name: record.display_name,
                    announced_at: record.announced_at,
                    expires_at: now + self.expiry,
                },
            );
        }

        let typing_changed = before.len() != self.typing.len()
            || self.typing.keys().any(|id| !before.contains(id));

        tracing::trace!(
            online = self.online.len(),
            typing = self.typing.len(),
            "Presence snapshot applied"
        );

        PresenceChange {
            online: online_changed,
            typing: typing_changed,
        }
    }

    /// Drop every typing grant whose deadline has passed
    ///
    /// Returns the users that stopped typing. The online set is untouched.
    pub fn expire_due(&mut self, now: Instant) -> Vec<UserId> {
        let expired: Vec<UserId> = self
            .typing
            .iter()
            .filter(|(_, grant)| grant.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(grant) = self.typing.remove(id) {
                self.expired.insert(id.clone(), grant.announced_at);
            }
            tracing::debug!(user_id = %id, "Typing expired");
        }
        expired
    }

    /// Earliest pending typing deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.typing.values().map(|grant| grant.expires_at).min()
    }

    /// Users with at least one record in the latest snapshot
    pub fn online_users(&self) -> HashSet<UserId> {
        self.online.keys().cloned().collect()
    }

    /// Remote users currently typing, with their display names
    pub fn typing_users(&self) -> HashMap<UserId, String> {
        self.typing
            .iter()
            .map(|(id, grant)| (id.clone(), grant.display_name.clone()))
            .collect()
    }

    /// Forget everything and cancel all deadlines
    pub fn clear(&mut self) {
        self.online.clear();
        self.typing.clear();
        self.expired.clear();
    }
}
