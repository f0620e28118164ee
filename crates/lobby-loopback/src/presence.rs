//! Presence topics with full-state snapshots
//!
//! Every membership change (join, publish, leave, disconnect) sends each member
//! the complete list of announced records, the way the realtime service does.

use std::collections::HashMap;
use std::sync::Arc;

use lobby_core::{
    ChannelState, PresenceEvent, PresencePublisher, PresenceRecord, SubscriptionSender,
    TransportError, TransportResult, UserId,
};
use parking_lot::Mutex;

use crate::fault::{Fault, FaultPlan};

struct Member {
    id: u64,
    user_id: UserId,
    events: SubscriptionSender<PresenceEvent>,
    record: Option<PresenceRecord>,
}

/// One presence topic
#[derive(Default)]
pub(crate) struct Topic {
    members: Vec<Member>,
}

impl Topic {
    fn records(&self) -> Vec<PresenceRecord> {
        self.members.iter().filter_map(|m| m.record.clone()).collect()
    }

    /// Drop members whose subscription was released
    ///
    /// Returns whether a dropped member had announced a record.
    fn prune(&mut self) -> bool {
        let mut announced_gone = false;
        self.members.retain(|m| {
            let keep = !m.events.is_released();
            if !keep {
                tracing::debug!(user_id = %m.user_id, "Presence member disconnected");
                announced_gone |= m.record.is_some();
            }
            keep
        });
        announced_gone
    }

    fn broadcast(&mut self) {
        self.prune();
        let records = self.records();
        for member in &self.members {
            member.events.send(PresenceEvent::Snapshot(records.clone()));
        }
    }

    fn member_mut(&mut self, id: u64) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }
}

/// Presence topics of a hub
#[derive(Default)]
pub(crate) struct Topics {
    topics: Mutex<HashMap<String, Topic>>,
    next_member: Mutex<u64>,
}

impl Topics {
    /// Add a member; it receives `Subscribed` and the current snapshot
    pub(crate) fn join(
        &self,
        topic: &str,
        user_id: UserId,
        events: SubscriptionSender<PresenceEvent>,
    ) -> u64 {
        let id = {
            let mut next = self.next_member.lock();
            *next += 1;
            *next
        };

        let mut topics = self.topics.lock();
        let entry = topics.entry(topic.to_string()).or_default();
        entry.prune();

        events.send(PresenceEvent::State(ChannelState::Subscribed));
        events.send(PresenceEvent::Snapshot(entry.records()));
        tracing::debug!(topic, user_id = %user_id, member = id, "Presence member joined");
        entry.members.push(Member {
            id,
            user_id,
            events,
            record: None,
        });
        id
    }

    pub(crate) fn set_record(&self, topic: &str, member: u64, record: Option<PresenceRecord>) -> bool {
        let mut topics = self.topics.lock();
        let Some(entry) = topics.get_mut(topic) else {
            return false;
        };
        let Some(slot) = entry.member_mut(member) else {
            return false;
        };
        slot.record = record;
        entry.broadcast();
        true
    }

    /// Re-broadcast if a disconnected member had announced itself
    pub(crate) fn sweep(&self, topic: &str) {
        let mut topics = self.topics.lock();
        if let Some(entry) = topics.get_mut(topic) {
            if entry.prune() {
                entry.broadcast();
            }
        }
    }

    /// Send a raw snapshot to every member, bypassing member records
    pub(crate) fn inject(&self, topic: &str, records: &[PresenceRecord]) {
        let mut topics = self.topics.lock();
        if let Some(entry) = topics.get_mut(topic) {
            entry.prune();
            for member in &entry.members {
                member.events.send(PresenceEvent::Snapshot(records.to_vec()));
            }
        }
    }

    /// Send a channel state to every member
    pub(crate) fn set_state(&self, topic: &str, state: ChannelState) {
        if let Some(entry) = self.topics.lock().get(topic) {
            for member in &entry.members {
                member.events.send(PresenceEvent::State(state));
            }
        }
    }

    pub(crate) fn records(&self, topic: &str) -> Vec<PresenceRecord> {
        self.topics
            .lock()
            .get(topic)
            .map(Topic::records)
            .unwrap_or_default()
    }

    pub(crate) fn member_count(&self, topic: &str) -> usize {
        let mut topics = self.topics.lock();
        topics.get_mut(topic).map_or(0, |entry| {
            entry.prune();
            entry.members.len()
        })
    }
}

/// Publishing half handed out by [`crate::LoopbackHub`]'s presence channel
pub struct LoopbackPublisher {
    pub(crate) topics: Arc<Topics>,
    pub(crate) faults: Arc<FaultPlan>,
    pub(crate) topic: String,
    pub(crate) member: u64,
}

impl PresencePublisher for LoopbackPublisher {
    fn publish(&self, record: PresenceRecord) -> TransportResult<()> {
        self.faults.check(Fault::Publish)?;
        if self.topics.set_record(&self.topic, self.member, Some(record)) {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }

    fn leave(&self) -> TransportResult<()> {
        if self.topics.set_record(&self.topic, self.member, None) {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}
