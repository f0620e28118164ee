//! In-process backend shared by every client of a room
//!
//! One hub plays the history API, the live insert feed, the presence channel
//! and the write path. Clients are wired to the same hub, so a message sent by
//! one arrives on every feed, and presence records fan out as snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use lobby_core::{
    ChannelState, FeedEvent, HistoryApi, Message, MessageFeed, MessageId, MessageSender,
    PresenceChannel, PresenceMembership, PresenceRecord, Profile, Subscription,
    SubscriptionSender, TransportResult, UserId,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::fault::{Fault, FaultPlan};
use crate::presence::{LoopbackPublisher, Topics};

/// Shared in-process backend
///
/// Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    messages: Mutex<Vec<Message>>,
    profiles: DashMap<UserId, Profile>,
    feeds: Mutex<Vec<SubscriptionSender<FeedEvent>>>,
    topics: Arc<Topics>,
    faults: Arc<FaultPlan>,
    /// Deliver every insert twice
    redeliver: AtomicBool,
    history_delay: Mutex<Option<Duration>>,
}

impl LoopbackHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hub that already knows `profiles`
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let hub = Self::new();
        for profile in profiles {
            hub.add_profile(profile);
        }
        hub
    }

    // ------------------------------------------------------------------
    // Seeding and inspection
    // ------------------------------------------------------------------

    pub fn add_profile(&self, profile: Profile) {
        self.inner.profiles.insert(profile.user_id.clone(), profile);
    }

    pub fn remove_profile(&self, user_id: &UserId) {
        self.inner.profiles.remove(user_id);
    }

    /// Store a message without delivering it live
    pub fn seed_message(&self, message: Message) {
        self.inner.messages.lock().push(message);
    }

    /// Store a message and deliver it on every feed
    pub fn insert(&self, message: Message) {
        self.seed_message(message.clone());
        self.deliver(message);
    }

    /// Deliver a message on every feed without storing it
    pub fn deliver(&self, message: Message) {
        let copies = if self.inner.redeliver.load(Ordering::SeqCst) { 2 } else { 1 };
        let mut feeds = self.inner.feeds.lock();
        feeds.retain(|feed| !feed.is_released());
        for feed in feeds.iter() {
            for _ in 0..copies {
                feed.send(FeedEvent::Inserted(message.clone()));
            }
        }
        tracing::trace!(message_id = %message.id, feeds = feeds.len(), "Message delivered");
    }

    /// Send a state transition on every feed
    pub fn set_feed_state(&self, state: ChannelState) {
        for feed in self.inner.feeds.lock().iter() {
            feed.send(FeedEvent::State(state));
        }
    }

    /// Send a state transition to every member of `topic`
    pub fn set_presence_state(&self, topic: &str, state: ChannelState) {
        self.inner.topics.set_state(topic, state);
    }

    /// Push a raw snapshot to every member of `topic`
    pub fn inject_snapshot(&self, topic: &str, records: &[PresenceRecord]) {
        self.inner.topics.inject(topic, records);
    }

    /// Records currently announced on `topic`
    pub fn presence_records(&self, topic: &str) -> Vec<PresenceRecord> {
        self.inner.topics.records(topic)
    }

    /// Connected members of `topic`
    pub fn presence_members(&self, topic: &str) -> usize {
        self.inner.topics.member_count(topic)
    }

    /// Live feeds still held by a subscriber
    pub fn feed_subscribers(&self) -> usize {
        let mut feeds = self.inner.feeds.lock();
        feeds.retain(|feed| !feed.is_released());
        feeds.len()
    }

    /// Every stored message, in storage order
    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.lock().clone()
    }

    // ------------------------------------------------------------------
    // Behavior switches
    // ------------------------------------------------------------------

    /// Make `fault` fail (or succeed again)
    pub fn set_fault(&self, fault: Fault, failing: bool) {
        self.inner.faults.set(fault, failing);
    }

    /// Deliver every live insert twice
    pub fn set_redelivery(&self, redeliver: bool) {
        self.inner.redeliver.store(redeliver, Ordering::SeqCst);
    }

    /// Hold the history fetch for `delay`, letting live events overtake it
    pub fn set_history_delay(&self, delay: Option<Duration>) {
        *self.inner.history_delay.lock() = delay;
    }
}

impl std::fmt::Debug for LoopbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackHub")
            .field("messages", &self.inner.messages.lock().len())
            .field("profiles", &self.inner.profiles.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HistoryApi for LoopbackHub {
    async fn fetch_messages(&self, limit: usize) -> TransportResult<Vec<Message>> {
        let delay = *self.inner.history_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.faults.check(Fault::FetchMessages)?;

        let mut messages = self.inner.messages.lock().clone();
        messages.sort_by(Message::cmp_order);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    async fn fetch_profiles(&self, ids: Option<&[UserId]>) -> TransportResult<Vec<Profile>> {
        self.inner.faults.check(Fault::FetchProfiles)?;

        let profiles = match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.inner.profiles.get(id).map(|p| p.value().clone()))
                .collect(),
            None => self.inner.profiles.iter().map(|p| p.value().clone()).collect(),
        };
        Ok(profiles)
    }
}

#[async_trait]
impl MessageFeed for LoopbackHub {
    async fn subscribe(&self) -> TransportResult<Subscription<FeedEvent>> {
        self.inner.faults.check(Fault::Subscribe)?;

        let (tx, subscription) = Subscription::channel();
        tx.send(FeedEvent::State(ChannelState::Subscribed));
        self.inner.feeds.lock().push(tx);
        tracing::debug!("Feed subscribed");
        Ok(subscription)
    }
}

#[async_trait]
impl PresenceChannel for LoopbackHub {
    async fn join(&self, topic: &str, member: &UserId) -> TransportResult<PresenceMembership> {
        self.inner.faults.check(Fault::Join)?;

        let (tx, events) = Subscription::channel();
        let watch = tx.clone();
        let id = self.inner.topics.join(topic, member.clone(), tx);

        // Announce the departure as soon as the member lets go
        let topics = self.inner.topics.clone();
        let name = topic.to_string();
        tokio::spawn(async move {
            watch.released().await;
            drop(watch);
            topics.sweep(&name);
        });

        Ok(PresenceMembership {
            events,
            publisher: Arc::new(LoopbackPublisher {
                topics: self.inner.topics.clone(),
                faults: self.inner.faults.clone(),
                topic: topic.to_string(),
                member: id,
            }),
        })
    }
}

#[async_trait]
impl MessageSender for LoopbackHub {
    async fn send_message(&self, author_id: &UserId, content: &str) -> TransportResult<()> {
        self.inner.faults.check(Fault::SendMessage)?;

        let message = Message::new(
            MessageId::new(Uuid::new_v4().to_string()),
            author_id.clone(),
            content,
            Utc::now(),
        );
        tracing::debug!(message_id = %message.id, author_id = %author_id, "Message stored");
        self.insert(message);
        Ok(())
    }
}
