//! Presence: remote online/typing state and local typing broadcast

mod tracker;
mod typing;

pub use tracker::{PresenceChange, PresenceTracker};
pub use typing::TypingBroadcaster;
