//! What the UI layer sees: a consistent view plus a stream of updates

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lobby_common::Notice;
use lobby_core::{ChannelState, Message, MessageId, Profile, UserId};
use serde::Serialize;

/// Read-only snapshot of the sync state
///
/// Cloning is cheap; every collection is shared.
#[derive(Debug, Clone)]
pub struct SyncView {
    pub self_id: UserId,
    pub messages: Arc<Vec<Message>>,
    /// Resolved message authors
    pub authors: Arc<HashMap<UserId, Profile>>,
    /// Every known profile, ordered by display name
    pub roster: Arc<Vec<Profile>>,
    pub online: Arc<HashSet<UserId>>,
    /// Remote users typing right now, with their display names
    pub typing: Arc<HashMap<UserId, String>>,
    pub messages_connected: bool,
    pub presence_connected: bool,
}

/// One row of the user list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub profile: Profile,
    pub online: bool,
    pub is_self: bool,
}

impl SyncView {
    /// Empty view for `self_id`
    pub fn new(self_id: UserId) -> Self {
        Self {
            self_id,
            messages: Arc::default(),
            authors: Arc::default(),
            roster: Arc::default(),
            online: Arc::default(),
            typing: Arc::default(),
            messages_connected: false,
            presence_connected: false,
        }
    }

    /// Author of `message`, `Unknown` until resolved
    pub fn author(&self, message: &Message) -> Profile {
        self.authors
            .get(&message.author_id)
            .cloned()
            .unwrap_or_else(|| Profile::unknown(message.author_id.clone()))
    }

    /// User list rows in roster order
    pub fn roster_entries(&self) -> Vec<RosterEntry> {
        self.roster
            .iter()
            .map(|profile| RosterEntry {
                online: self.online.contains(&profile.user_id),
                is_self: profile.user_id == self.self_id,
                profile: profile.clone(),
            })
            .collect()
    }

    /// Display names of typing users, sorted
    pub fn typing_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.typing.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.online.contains(user_id)
    }

    /// Own profile from the roster, if listed
    pub fn own_profile(&self) -> Option<&Profile> {
        self.roster.iter().find(|p| p.user_id == self.self_id)
    }
}

/// Which live channel a connection change refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Messages,
    Presence,
}

/// Incremental change notification
///
/// The view is already updated when an update is delivered.
#[derive(Debug, Clone)]
pub enum SyncUpdate {
    /// Historical batch merged into the log
    HistoryLoaded { added: usize },
    /// A live message was newly accepted (never sent for duplicates)
    MessageAdded(Message),
    /// The author profile of `message_id` became available
    AuthorResolved {
        message_id: MessageId,
        profile: Profile,
    },
    RosterRefreshed,
    /// Online or typing set changed
    PresenceChanged,
    ConnectionChanged { stream: Stream, state: ChannelState },
    /// Send accepted by the backend; the input can be cleared
    SendSucceeded,
    /// Send failed; `content` is handed back so the input keeps it
    SendFailed { content: String, notice: Notice },
    /// Non-fatal problem to show to the user
    Notice(Notice),
}

/// Why the controller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncExit {
    /// [`crate::SyncHandle::shutdown`] was called
    Shutdown,
    /// The session ended; the host should redirect to sign-in
    SessionEnded,
    /// Every handle was dropped
    HandleDropped,
}
