//! Collaborator traits (ports) - what the sync engine needs from the outside
//!
//! Authentication, storage and the realtime transport are owned elsewhere.
//! The engine only sees these contracts; `lobby-loopback` provides an
//! in-process implementation of all of them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use super::subscription::Subscription;
use crate::entities::{Message, PresenceRecord, Profile, Session};
use crate::error::TransportResult;
use crate::events::{FeedEvent, PresenceEvent};
use crate::value_objects::UserId;

// ============================================================================
// Identity
// ============================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session of the local user, or `None` when signed out
    async fn current_session(&self) -> Option<Session>;

    /// Receiver that observes every session change (sign-out sends `None`)
    fn watch_session(&self) -> watch::Receiver<Option<Session>>;
}

// ============================================================================
// Historical read API
// ============================================================================

#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// Most recent `limit` messages, ordered by `created_at` ascending
    async fn fetch_messages(&self, limit: usize) -> TransportResult<Vec<Message>>;

    /// Profiles for `ids`, or every profile when `ids` is `None`
    ///
    /// Unknown ids are simply absent from the result.
    async fn fetch_profiles(&self, ids: Option<&[UserId]>) -> TransportResult<Vec<Profile>>;
}

// ============================================================================
// Live message feed
// ============================================================================

#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Open the insert stream
    ///
    /// The first event is normally `FeedEvent::State(Subscribed)`. Dropping the
    /// returned subscription releases it.
    async fn subscribe(&self) -> TransportResult<Subscription<FeedEvent>>;
}

// ============================================================================
// Presence broadcast channel
// ============================================================================

/// Publishing half of a presence membership
///
/// Calls are non-blocking: the record is handed to the transport and the
/// resulting snapshot arrives later on the membership's event stream.
pub trait PresencePublisher: Send + Sync {
    /// Announce (or replace) this client's record
    fn publish(&self, record: PresenceRecord) -> TransportResult<()>;

    /// Withdraw this client's record
    fn leave(&self) -> TransportResult<()>;
}

/// Joined presence topic: incoming snapshots plus the way to announce ourselves
pub struct PresenceMembership {
    pub events: Subscription<PresenceEvent>,
    pub publisher: Arc<dyn PresencePublisher>,
}

#[async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Join `topic` as `member`
    async fn join(&self, topic: &str, member: &UserId) -> TransportResult<PresenceMembership>;
}

// ============================================================================
// Send
// ============================================================================

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Insert a new message; the backend assigns id and timestamp
    ///
    /// The inserted message comes back through the live feed.
    async fn send_message(&self, author_id: &UserId, content: &str) -> TransportResult<()>;
}
