//! Typing broadcaster
//!
//! Turns local keystrokes into presence updates: `typing = true` on the
//! leading edge, `typing = false` once the input has been quiet for the idle
//! window. Nothing is published before the presence channel confirms the
//! subscription.

use std::sync::Arc;
use std::time::Duration;

use lobby_common::{Operation, SyncError, SyncResult};
use lobby_core::{PresencePublisher, PresenceRecord, UserId};
use tokio::time::Instant;

/// Debounced publisher of this client's typing state
pub struct TypingBroadcaster {
    publisher: Arc<dyn PresencePublisher>,
    user_id: UserId,
    display_name: String,
    idle: Duration,
    typing: bool,
    idle_at: Option<Instant>,
    announced: bool,
}

impl TypingBroadcaster {
    /// Create an idle, not yet announced broadcaster
    pub fn new(
        publisher: Arc<dyn PresencePublisher>,
        user_id: UserId,
        display_name: impl Into<String>,
        idle: Duration,
    ) -> Self {
        Self {
            publisher,
            user_id,
            display_name: display_name.into(),
            idle,
            typing: false,
            idle_at: None,
            announced: false,
        }
    }

    /// Start publishing: announce the current state once the channel is up
    pub fn announce(&mut self) -> SyncResult<()> {
        self.announced = true;
        tracing::info!(user_id = %self.user_id, name = %self.display_name, "Announcing presence");
        self.publish()
    }

    /// Local content changed
    ///
    /// Publishes `typing = true` only when coming from idle; every call pushes
    /// the idle deadline out. Returns whether a publish happened.
    pub fn on_local_input(&mut self, now: Instant) -> SyncResult<bool> {
        self.idle_at = Some(now + self.idle);
        if self.typing {
            return Ok(false);
        }

        self.typing = true;
        self.publish_if_announced()
    }

    /// Publish `typing = false` if the idle deadline has passed
    pub fn poll_idle(&mut self, now: Instant) -> SyncResult<bool> {
        match self.idle_at {
            Some(deadline) if deadline <= now => {
                self.idle_at = None;
                self.typing = false;
                tracing::debug!(user_id = %self.user_id, "Typing idle");
                self.publish_if_announced()
            }
            _ => Ok(false),
        }
    }

    /// Cancel the idle deadline and publish `typing = false` right away
    ///
    /// Used after every send attempt, however recent the last keystroke.
    pub fn force_idle(&mut self) -> SyncResult<bool> {
        self.idle_at = None;
        self.typing = false;
        self.publish_if_announced()
    }

    /// Change the announced name, republishing with the current typing flag
    pub fn set_display_name(&mut self, name: impl Into<String>) -> SyncResult<bool> {
        let name = name.into();
        if name == self.display_name {
            return Ok(false);
        }
        self.display_name = name;
        self.publish_if_announced()
    }

    /// Withdraw this client's record and cancel the idle deadline
    pub fn leave(&mut self) -> SyncResult<()> {
        self.idle_at = None;
        self.typing = false;
        if !std::mem::take(&mut self.announced) {
            return Ok(());
        }
        self.publisher
            .leave()
            .map_err(|e| SyncError::transport(Operation::PublishPresence, e))
    }

    /// Pending idle deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.idle_at
    }

    /// Record describing the current local state
    pub fn record(&self) -> PresenceRecord {
        PresenceRecord::new(self.user_id.clone(), self.display_name.clone(), self.typing)
    }

    fn publish_if_announced(&self) -> SyncResult<bool> {
        if !self.announced {
            return Ok(false);
        }
        self.publish().map(|()| true)
    }

    fn publish(&self) -> SyncResult<()> {
        tracing::trace!(user_id = %self.user_id, typing = self.typing, "Publishing presence");
        self.publisher
            .publish(self.record())
            .map_err(|e| SyncError::transport(Operation::PublishPresence, e))
    }
}

impl std::fmt::Debug for TypingBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingBroadcaster")
            .field("user_id", &self.user_id)
            .field("typing", &self.typing)
            .field("idle_at", &self.idle_at)
            .field("announced", &self.announced)
            .finish()
    }
}
