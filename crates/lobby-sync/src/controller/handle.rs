//! Handle to a running controller

use lobby_common::{SyncError, SyncResult};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::view::{SyncExit, SyncUpdate, SyncView};

/// Requests from the UI layer to the controller task
#[derive(Debug)]
pub(crate) enum Command {
    LocalInput,
    Send {
        content: String,
        reply: oneshot::Sender<SyncResult<()>>,
    },
    RefreshRoster,
    Shutdown,
}

/// Handle returned by [`crate::SyncController::start`]
///
/// Dropping the handle stops the controller (with [`SyncExit::HandleDropped`]).
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SyncView>,
    updates: broadcast::Sender<SyncUpdate>,
    /// Receiver created before the controller started, so startup updates are kept
    first_updates: Option<broadcast::Receiver<SyncUpdate>>,
    task: JoinHandle<SyncExit>,
}

impl SyncHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        view: watch::Receiver<SyncView>,
        updates: broadcast::Sender<SyncUpdate>,
        first_updates: broadcast::Receiver<SyncUpdate>,
        task: JoinHandle<SyncExit>,
    ) -> Self {
        Self {
            commands,
            view,
            updates,
            first_updates: Some(first_updates),
            task,
        }
    }

    /// Report a local content change (one call per keystroke)
    pub fn local_input(&self) -> SyncResult<()> {
        self.command(Command::LocalInput)
    }

    /// Send a message
    ///
    /// Resolves once the backend answered. On failure the content is also
    /// handed back through [`SyncUpdate::SendFailed`].
    ///
    /// # Errors
    /// `SyncError::Domain` for empty or too long content, `SyncError::Transport`
    /// if the backend refused or could not be reached.
    pub async fn send(&self, content: impl Into<String>) -> SyncResult<()> {
        let (reply, outcome) = oneshot::channel();
        self.command(Command::Send {
            content: content.into(),
            reply,
        })?;
        outcome.await.map_err(|_| SyncError::Stopped)?
    }

    /// Fetch the roster again
    pub fn refresh_roster(&self) -> SyncResult<()> {
        self.command(Command::RefreshRoster)
    }

    /// Current view
    pub fn view(&self) -> SyncView {
        self.view.borrow().clone()
    }

    /// Receiver that observes every view change
    pub fn watch_view(&self) -> watch::Receiver<SyncView> {
        self.view.clone()
    }

    /// Subscribe to updates
    ///
    /// The first call also yields everything emitted during startup.
    pub fn updates(&mut self) -> broadcast::Receiver<SyncUpdate> {
        self.first_updates
            .take()
            .unwrap_or_else(|| self.updates.subscribe())
    }

    /// Whether the controller task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the controller and wait for it to tear down
    pub async fn shutdown(self) -> SyncResult<SyncExit> {
        // The controller may already be gone (session ended); join reports why
        let _ = self.commands.send(Command::Shutdown);
        self.join().await
    }

    /// Wait for the controller to exit on its own
    pub async fn join(self) -> SyncResult<SyncExit> {
        self.task.await.map_err(SyncError::internal)
    }

    fn command(&self, command: Command) -> SyncResult<()> {
        self.commands.send(command).map_err(|_| SyncError::Stopped)
    }
}
