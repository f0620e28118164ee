//! Events delivered by the live feed and the presence channel

mod feed_event;

pub use feed_event::{ChannelState, FeedEvent, PresenceEvent};
