//! # lobby-core
//!
//! Domain layer for the lobby sync engine: messages, profiles, presence records,
//! error types, and the ports through which the engine talks to its collaborators
//! (identity, history API, live feed, presence channel, send).
//! This crate has no dependency on any concrete transport.

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Draft, Message, PresenceRecord, Profile, Session, MAX_CONTENT_CHARS, UNKNOWN_DISPLAY_NAME,
};
pub use error::{DomainError, TransportError, TransportResult};
pub use events::{ChannelState, FeedEvent, PresenceEvent};
pub use traits::{
    HistoryApi, IdentityProvider, MessageFeed, MessageSender, PresenceChannel, PresenceMembership,
    PresencePublisher, Subscription, SubscriptionSender,
};
pub use value_objects::{IdParseError, MessageId, UserId};
