//! Collaborator traits (ports) and the subscription handle they hand out

mod collaborators;
mod subscription;

pub use collaborators::{
    HistoryApi, IdentityProvider, MessageFeed, MessageSender, PresenceChannel,
    PresenceMembership, PresencePublisher,
};
pub use subscription::{Subscription, SubscriptionSender};
