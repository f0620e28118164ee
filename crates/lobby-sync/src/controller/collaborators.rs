//! Collaborators - the outside services a controller is wired to

use std::sync::Arc;

use lobby_common::{ConfigError, SyncError, SyncResult};
use lobby_core::{HistoryApi, IdentityProvider, MessageFeed, MessageSender, PresenceChannel};

/// Dependency container handed to [`crate::SyncController::start`]
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub history: Arc<dyn HistoryApi>,
    pub feed: Arc<dyn MessageFeed>,
    pub presence: Arc<dyn PresenceChannel>,
    pub sender: Arc<dyn MessageSender>,
}

impl Collaborators {
    /// Start building a collaborator set
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::new()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Builder for [`Collaborators`]
#[derive(Default)]
pub struct CollaboratorsBuilder {
    identity: Option<Arc<dyn IdentityProvider>>,
    history: Option<Arc<dyn HistoryApi>>,
    feed: Option<Arc<dyn MessageFeed>>,
    presence: Option<Arc<dyn PresenceChannel>>,
    sender: Option<Arc<dyn MessageSender>>,
}

impl CollaboratorsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryApi>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn feed(mut self, feed: Arc<dyn MessageFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn presence(mut self, presence: Arc<dyn PresenceChannel>) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Build the collaborator set
    ///
    /// # Errors
    /// Returns `ConfigError::MissingCollaborator` if any collaborator is missing
    pub fn build(self) -> SyncResult<Collaborators> {
        Ok(Collaborators {
            identity: self.identity.ok_or_else(|| missing("identity"))?,
            history: self.history.ok_or_else(|| missing("history"))?,
            feed: self.feed.ok_or_else(|| missing("feed"))?,
            presence: self.presence.ok_or_else(|| missing("presence"))?,
            sender: self.sender.ok_or_else(|| missing("sender"))?,
        })
    }
}

fn missing(name: &'static str) -> SyncError {
    ConfigError::MissingCollaborator(name).into()
}
