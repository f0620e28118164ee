//! Live feed and presence channel event types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{Message, PresenceRecord};

/// Subscription state reported by a realtime channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelState {
    /// Subscription confirmed by the server
    Subscribed,
    /// Channel closed (by either side)
    Closed,
    /// Subscription attempt timed out
    TimedOut,
    /// Channel reported an error
    #[serde(rename = "CHANNEL_ERROR")]
    Errored,
}

impl ChannelState {
    /// Get the string representation of the state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribed => "SUBSCRIBED",
            Self::Closed => "CLOSED",
            Self::TimedOut => "TIMED_OUT",
            Self::Errored => "CHANNEL_ERROR",
        }
    }

    /// Check if events can flow on this channel
    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event on the live message feed
///
/// Delivery is at-least-once: the same `Inserted` message may arrive more
/// than once, and may duplicate one from the historical fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Inserted(Message),
    State(ChannelState),
}

/// Event on the presence channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Complete set of currently announced records
    Snapshot(Vec<PresenceRecord>),
    State(ChannelState),
}
