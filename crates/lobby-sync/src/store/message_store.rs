//! Ordered, deduplicated message log
//!
//! Merges the historical batch with live inserts. Membership by id is the only
//! guard against double insertion, whichever source a message arrives through.

use std::collections::HashSet;
use std::sync::Arc;

use lobby_core::{Message, MessageId};

/// Message log ordered by `(created_at, id)`
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Arc<Vec<Message>>,
    ids: HashSet<MessageId>,
    loaded: bool,
}

impl MessageStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the historical batch
    ///
    /// Live messages appended before the batch arrived are kept; batch entries
    /// whose id is already present are skipped. Returns how many batch entries
    /// were new.
    pub fn load(&mut self, batch: Vec<Message>) -> usize {
        if self.loaded {
            tracing::warn!("History loaded twice, merging second batch");
        }
        self.loaded = true;

        let mut fresh: Vec<Message> = batch
            .into_iter()
            .filter(|m| self.ids.insert(m.id.clone()))
            .collect();
        let added = fresh.len();
        if added == 0 {
            return 0;
        }

        let messages = Arc::make_mut(&mut self.messages);
        messages.append(&mut fresh);
        // Stable sort, so already ordered input stays cheap
        messages.sort_by(Message::cmp_order);

        tracing::debug!(added, total = messages.len(), "History merged");
        added
    }

    /// Insert `candidate` unless a message with the same id exists
    ///
    /// Returns whether the message was newly inserted.
    pub fn append(&mut self, candidate: Message) -> bool {
        if self.ids.contains(&candidate.id) {
            tracing::trace!(message_id = %candidate.id, "Duplicate message dropped");
            return false;
        }
        self.ids.insert(candidate.id.clone());

        let messages = Arc::make_mut(&mut self.messages);
        // Live inserts normally arrive in order, so this is usually the tail
        let at = messages.partition_point(|m| m.cmp_order(&candidate).is_lt());
        messages.insert(at, candidate);
        true
    }

    /// Current ordered view; cloning the `Arc` is O(1)
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.messages)
    }

    /// Number of stored messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
