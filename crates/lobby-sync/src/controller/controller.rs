//! Sync controller
//!
//! One task owns the message store, the presence tracker and the typing
//! broadcaster. It multiplexes the live feed, presence snapshots, UI commands,
//! results of background network calls, the session watch and the earliest
//! timer deadline. Network calls run as child tasks, so a slow fetch never
//! holds back event delivery; their results come back tagged by message id.

use std::collections::{HashMap, HashSet};
use std::future::pending;
use std::sync::Arc;

use lobby_common::{Notice, Operation, SyncConfig, SyncError, SyncResult};
use lobby_core::{
    ChannelState, Draft, FeedEvent, IdentityProvider, Message, MessageId, MessageSender,
    PresenceEvent, Profile, Session, Subscription, UserId,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{instrument, Instrument};

use super::collaborators::Collaborators;
use super::handle::{Command, SyncHandle};
use super::view::{Stream, SyncExit, SyncUpdate, SyncView};
use crate::directory::ProfileDirectory;
use crate::presence::{PresenceTracker, TypingBroadcaster};
use crate::store::MessageStore;

/// Result of a background network call
enum TaskOutcome {
    History {
        messages: SyncResult<Vec<Message>>,
        authors: HashMap<UserId, Profile>,
        author_error: Option<SyncError>,
    },
    Author {
        message_id: MessageId,
        profile: Profile,
        error: Option<SyncError>,
    },
    Roster(SyncResult<Vec<Profile>>),
    Sent {
        content: String,
        result: SyncResult<()>,
        reply: oneshot::Sender<SyncResult<()>>,
    },
}

/// Orchestrates the sync engine for one signed-in user
pub struct SyncController {
    config: SyncConfig,
    self_id: UserId,
    directory: Arc<ProfileDirectory>,
    sender: Arc<dyn MessageSender>,

    store: MessageStore,
    tracker: PresenceTracker,
    typing: Option<TypingBroadcaster>,
    authors: Arc<HashMap<UserId, Profile>>,
    roster: Arc<Vec<Profile>>,
    messages_connected: bool,
    presence_connected: bool,

    feed: Option<Subscription<FeedEvent>>,
    presence: Option<Subscription<PresenceEvent>>,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Owns the sender side of `session`
    _identity: Arc<dyn IdentityProvider>,
    /// `None` once the provider closed its watch
    session: Option<watch::Receiver<Option<Session>>>,
    tasks: JoinSet<TaskOutcome>,

    view_tx: watch::Sender<SyncView>,
    updates: broadcast::Sender<SyncUpdate>,
}

impl SyncController {
    /// Resolve the session, open every channel and spawn the controller task
    ///
    /// Transport failures while opening channels are reported as notices and
    /// leave the engine running with whatever is available.
    ///
    /// # Errors
    /// `SyncError::NoSession` when nobody is signed in, `SyncError::Config`
    /// for an invalid configuration.
    #[instrument(name = "sync_start", skip_all)]
    pub async fn start(config: SyncConfig, collaborators: Collaborators) -> SyncResult<SyncHandle> {
        config.validate()?;

        let Collaborators {
            identity,
            history,
            feed,
            presence,
            sender,
        } = collaborators;

        // (a) identity
        let session = identity.current_session().await.ok_or(SyncError::NoSession)?;
        let session_rx = identity.watch_session();
        let self_id = session.user_id;
        tracing::info!(user_id = %self_id, "Starting sync");

        let (updates, first_updates) = broadcast::channel(config.update_buffer);
        let (view_tx, view_rx) = watch::channel(SyncView::new(self_id.clone()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let directory = ProfileDirectory::new_shared(history.clone(), config.profile_ttl);
        let mut tasks = JoinSet::new();

        // (b) historical fetch, off the event path
        {
            let history = history.clone();
            let directory = directory.clone();
            let limit = config.history_limit;
            tasks.spawn(async move { fetch_history(history.as_ref(), &directory, limit).await });
        }
        {
            let directory = directory.clone();
            tasks.spawn(async move { TaskOutcome::Roster(directory.lookup_all().await) });
        }

        let mut controller = Self {
            tracker: PresenceTracker::new(self_id.clone(), config.typing_expiry),
            config,
            self_id,
            directory,
            sender,
            store: MessageStore::new(),
            typing: None,
            authors: Arc::default(),
            roster: Arc::default(),
            messages_connected: false,
            presence_connected: false,
            feed: None,
            presence: None,
            commands: command_rx,
            _identity: identity,
            session: Some(session_rx),
            tasks,
            view_tx,
            updates,
        };

        // (c) live message feed
        match feed.subscribe().await {
            Ok(subscription) => controller.feed = Some(subscription),
            Err(e) => controller.report(&SyncError::transport(Operation::SubscribeMessages, e)),
        }

        // (d) presence channel; own record goes out once the join is confirmed
        match presence
            .join(&controller.config.presence_channel, &controller.self_id)
            .await
        {
            Ok(membership) => {
                controller.presence = Some(membership.events);
                controller.typing = Some(TypingBroadcaster::new(
                    membership.publisher,
                    controller.self_id.clone(),
                    controller.config.fallback_display_name.clone(),
                    controller.config.typing_idle,
                ));
            }
            Err(e) => controller.report(&SyncError::transport(Operation::JoinPresence, e)),
        }

        let updates = controller.updates.clone();
        let span = tracing::info_span!("sync_controller", user_id = %controller.self_id);
        let task = tokio::spawn(controller.run().instrument(span));

        Ok(SyncHandle::new(command_tx, view_rx, updates, first_updates, task))
    }

    async fn run(mut self) -> SyncExit {
        let exit = loop {
            let deadline = self.next_deadline();

            tokio::select! {
                event = next_event(&mut self.feed) => match event {
                    Some(event) => self.on_feed_event(event),
                    None => {
                        tracing::warn!("Message feed ended");
                        self.feed = None;
                        self.set_connection(Stream::Messages, ChannelState::Closed);
                    }
                },
                event = next_event(&mut self.presence) => match event {
                    Some(event) => self.on_presence_event(event),
                    None => {
                        tracing::warn!("Presence channel ended");
                        self.presence = None;
                        self.set_connection(Stream::Presence, ChannelState::Closed);
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) => break SyncExit::Shutdown,
                    Some(command) => self.on_command(command),
                    None => break SyncExit::HandleDropped,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => match joined {
                    Ok(outcome) => self.on_task_outcome(outcome),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Background task failed");
                        self.report(&SyncError::internal(e));
                    }
                },
                changed = session_changed(&mut self.session) => {
                    if changed.is_err() {
                        // The provider went away; the last known session stands
                        tracing::warn!("Session watch closed");
                        self.session = None;
                        continue;
                    }
                    let self_id = &self.self_id;
                    let still_signed_in = self.session.as_mut().is_some_and(|rx| {
                        rx.borrow_and_update()
                            .as_ref()
                            .is_some_and(|s| &s.user_id == self_id)
                    });
                    if !still_signed_in {
                        tracing::info!("Session ended");
                        break SyncExit::SessionEnded;
                    }
                },
                () = sleep_until_deadline(deadline) => self.on_deadline(Instant::now()),
            }
        };

        self.teardown();
        tracing::info!(?exit, "Sync stopped");
        exit
    }

    fn next_deadline(&self) -> Option<Instant> {
        let typing = self.typing.as_ref().and_then(TypingBroadcaster::next_deadline);
        match (self.tracker.next_deadline(), typing) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ------------------------------------------------------------------
    // Live message feed
    // ------------------------------------------------------------------

    fn on_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Inserted(message) => self.on_live_message(message),
            FeedEvent::State(state) => {
                tracing::debug!(%state, "Message feed state");
                self.set_connection(Stream::Messages, state);
            }
        }
    }

    fn on_live_message(&mut self, message: Message) {
        if !self.store.append(message.clone()) {
            return;
        }
        tracing::debug!(message_id = %message.id, author_id = %message.author_id, "Message added");

        let author_id = message.author_id.clone();
        let message_id = message.id.clone();
        self.publish_view();
        self.emit(SyncUpdate::MessageAdded(message));

        if self.authors.contains_key(&author_id) {
            return;
        }
        if let Some(profile) = self.directory.cached(&author_id) {
            self.resolve_author(message_id, profile);
            return;
        }

        let directory = self.directory.clone();
        self.tasks.spawn(async move {
            let ids = HashSet::from([author_id.clone()]);
            let (profile, error) = match directory.lookup_many(&ids).await {
                Ok(mut found) => (found.remove(&author_id), None),
                Err(e) => (None, Some(e)),
            };
            TaskOutcome::Author {
                message_id,
                profile: profile.unwrap_or_else(|| Profile::unknown(author_id)),
                error,
            }
        });
    }

    fn resolve_author(&mut self, message_id: MessageId, profile: Profile) {
        if !profile.is_unknown() {
            Arc::make_mut(&mut self.authors).insert(profile.user_id.clone(), profile.clone());
            self.publish_view();
        }
        self.emit(SyncUpdate::AuthorResolved {
            message_id,
            profile,
        });
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    fn on_presence_event(&mut self, event: PresenceEvent) {
        match event {
            PresenceEvent::Snapshot(records) => {
                let change = self.tracker.on_snapshot(records, Instant::now());
                if !change.is_empty() {
                    self.publish_view();
                    self.emit(SyncUpdate::PresenceChanged);
                }
            }
            PresenceEvent::State(state) => {
                tracing::debug!(%state, "Presence channel state");
                if state.is_subscribed() {
                    if let Some(Err(e)) = self.typing.as_mut().map(TypingBroadcaster::announce) {
                        self.report(&e);
                    }
                }
                self.set_connection(Stream::Presence, state);
            }
        }
    }

    fn on_deadline(&mut self, now: Instant) {
        if !self.tracker.expire_due(now).is_empty() {
            self.publish_view();
            self.emit(SyncUpdate::PresenceChanged);
        }
        if let Some(Err(e)) = self.typing.as_mut().map(|t| t.poll_idle(now)) {
            self.report(&e);
        }
    }

    fn set_connection(&mut self, stream: Stream, state: ChannelState) {
        let connected = state.is_subscribed();
        let slot = match stream {
            Stream::Messages => &mut self.messages_connected,
            Stream::Presence => &mut self.presence_connected,
        };
        *slot = connected;
        self.publish_view();
        self.emit(SyncUpdate::ConnectionChanged { stream, state });
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn on_command(&mut self, command: Command) {
        match command {
            Command::LocalInput => {
                if let Some(Err(e)) = self.typing.as_mut().map(|t| t.on_local_input(Instant::now())) {
                    self.report(&e);
                }
            }
            Command::Send { content, reply } => self.send(content, reply),
            Command::RefreshRoster => {
                let directory = self.directory.clone();
                self.tasks
                    .spawn(async move { TaskOutcome::Roster(directory.lookup_all().await) });
            }
            // Handled by the loop
            Command::Shutdown => {}
        }
    }

    fn send(&mut self, content: String, reply: oneshot::Sender<SyncResult<()>>) {
        let draft = match Draft::parse(&content) {
            Ok(draft) => draft,
            Err(e) => {
                let err = SyncError::from(e);
                self.emit(SyncUpdate::Notice(Notice::from(&err)));
                let _ = reply.send(Err(err));
                return;
            }
        };

        let sender = self.sender.clone();
        let author_id = self.self_id.clone();
        self.tasks.spawn(async move {
            let result = sender
                .send_message(&author_id, draft.content())
                .await
                .map_err(|e| SyncError::transport(Operation::SendMessage, e));
            TaskOutcome::Sent {
                content,
                result,
                reply,
            }
        });
    }

    // ------------------------------------------------------------------
    // Background results
    // ------------------------------------------------------------------

    fn on_task_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::History {
                messages,
                authors,
                author_error,
            } => {
                match messages {
                    Ok(batch) => {
                        let added = self.store.load(batch);
                        let known = Arc::make_mut(&mut self.authors);
                        known.extend(authors.into_iter().filter(|(_, p)| !p.is_unknown()));
                        tracing::info!(added, total = self.store.len(), "History loaded");
                        self.publish_view();
                        self.emit(SyncUpdate::HistoryLoaded { added });
                    }
                    Err(e) => self.report(&e),
                }
                if let Some(e) = author_error {
                    self.report(&e);
                }
            }
            TaskOutcome::Author {
                message_id,
                profile,
                error,
            } => {
                if let Some(e) = error {
                    self.report(&e);
                }
                self.resolve_author(message_id, profile);
            }
            TaskOutcome::Roster(Ok(roster)) => self.apply_roster(roster),
            TaskOutcome::Roster(Err(e)) => self.report(&e),
            TaskOutcome::Sent {
                content,
                result,
                reply,
            } => {
                // Typing goes idle whatever the outcome
                if let Some(Err(e)) = self.typing.as_mut().map(TypingBroadcaster::force_idle) {
                    self.report(&e);
                }
                match &result {
                    Ok(()) => self.emit(SyncUpdate::SendSucceeded),
                    Err(e) => {
                        tracing::warn!(error = %e, "Send failed");
                        self.emit(SyncUpdate::SendFailed {
                            content,
                            notice: Notice::from(e),
                        });
                    }
                }
                let _ = reply.send(result);
            }
        }
    }

    fn apply_roster(&mut self, roster: Vec<Profile>) {
        let own_name = roster
            .iter()
            .find(|p| p.user_id == self.self_id)
            .map(|p| p.display_name.clone());

        // Refresh names of authors already on screen
        let authors = Arc::make_mut(&mut self.authors);
        for profile in &roster {
            if let Some(known) = authors.get_mut(&profile.user_id) {
                known.clone_from(profile);
            }
        }

        // Profiles of users who left the roster go once their ttl passes
        let evicted = self.directory.evict_stale();
        tracing::debug!(
            profiles = roster.len(),
            evicted,
            cached = self.directory.cache_len(),
            "Roster refreshed"
        );
        self.roster = Arc::new(roster);
        self.publish_view();
        self.emit(SyncUpdate::RosterRefreshed);

        if let Some(name) = own_name {
            let republished = self.typing.as_mut().map(|t| t.set_display_name(name));
            if let Some(Err(e)) = republished {
                self.report(&e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    fn publish_view(&self) {
        self.view_tx.send_replace(SyncView {
            self_id: self.self_id.clone(),
            messages: self.store.snapshot(),
            authors: Arc::clone(&self.authors),
            roster: Arc::clone(&self.roster),
            online: Arc::new(self.tracker.online_users()),
            typing: Arc::new(self.tracker.typing_users()),
            messages_connected: self.messages_connected,
            presence_connected: self.presence_connected,
        });
    }

    fn emit(&self, update: SyncUpdate) {
        // No receivers is fine; the view still carries the state
        let _ = self.updates.send(update);
    }

    /// Surface a non-fatal problem; prior state stays as it is
    fn report(&self, err: &SyncError) {
        tracing::warn!(error = %err, code = err.code(), "Sync degraded");
        self.emit(SyncUpdate::Notice(Notice::from(err)));
    }

    fn teardown(&mut self) {
        if let Some(mut typing) = self.typing.take() {
            if let Err(e) = typing.leave() {
                tracing::warn!(error = %e, "Failed to leave presence");
            }
        }
        // Dropping the subscriptions releases them
        self.feed = None;
        self.presence = None;
        self.tasks.abort_all();
        self.tracker.clear();
        self.messages_connected = false;
        self.presence_connected = false;
        self.publish_view();
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("self_id", &self.self_id)
            .field("messages", &self.store.len())
            .field("typing", &self.typing)
            .finish_non_exhaustive()
    }
}

async fn fetch_history(
    history: &dyn lobby_core::HistoryApi,
    directory: &ProfileDirectory,
    limit: usize,
) -> TaskOutcome {
    let messages = history
        .fetch_messages(limit)
        .await
        .map_err(|e| SyncError::transport(Operation::FetchMessages, e));

    let (authors, author_error) = match &messages {
        Ok(batch) if !batch.is_empty() => {
            let ids: HashSet<UserId> = batch.iter().map(|m| m.author_id.clone()).collect();
            match directory.lookup_many(&ids).await {
                Ok(found) => (found, None),
                Err(e) => (directory.fallback(&ids), Some(e)),
            }
        }
        _ => (HashMap::new(), None),
    };

    TaskOutcome::History {
        messages,
        authors,
        author_error,
    }
}

async fn next_event<T>(subscription: &mut Option<Subscription<T>>) -> Option<T> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => pending().await,
    }
}

async fn session_changed(
    session: &mut Option<watch::Receiver<Option<Session>>>,
) -> Result<(), watch::error::RecvError> {
    match session {
        Some(session) => session.changed().await,
        None => pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
