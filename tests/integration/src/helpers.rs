//! Test helpers for integration tests
//!
//! Provides a client wrapper that starts a controller against a hub and waits
//! on its view and update stream with a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lobby_common::{SyncConfig, SyncResult};
use lobby_core::UserId;
use lobby_loopback::{LoopbackHub, LoopbackIdentity};
use lobby_sync::{Collaborators, SyncController, SyncHandle, SyncUpdate, SyncView};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::timeout;

/// Upper bound for every wait; virtual time when the clock is paused
pub const WAIT: Duration = Duration::from_secs(10);

/// Presence topic used by [`test_config`]
pub const TOPIC: &str = "room:test";

/// Create a test configuration
pub fn test_config() -> SyncConfig {
    SyncConfig {
        presence_channel: TOPIC.to_string(),
        ..SyncConfig::default()
    }
}

/// Collaborators for `identity`, all backed by `hub`
pub fn collaborators(hub: &LoopbackHub, identity: Arc<LoopbackIdentity>) -> SyncResult<Collaborators> {
    let hub = Arc::new(hub.clone());
    Collaborators::builder()
        .identity(identity)
        .history(hub.clone())
        .feed(hub.clone())
        .presence(hub.clone())
        .sender(hub)
        .build()
}

/// A running client and the identity it was started with
pub struct TestClient {
    pub user_id: UserId,
    pub identity: Arc<LoopbackIdentity>,
    pub handle: SyncHandle,
    pub updates: broadcast::Receiver<SyncUpdate>,
}

impl TestClient {
    /// Sign `user` in and start a client on `hub`
    pub async fn start(hub: &LoopbackHub, user: &str) -> Result<Self> {
        Self::start_with_config(hub, user, test_config()).await
    }

    /// Start a client with custom config
    pub async fn start_with_config(hub: &LoopbackHub, user: &str, config: SyncConfig) -> Result<Self> {
        let identity = Arc::new(LoopbackIdentity::signed_in(user));
        let mut handle = SyncController::start(config, collaborators(hub, identity.clone())?).await?;
        let updates = handle.updates();

        Ok(Self {
            user_id: UserId::from(user),
            identity,
            handle,
            updates,
        })
    }

    /// Start and wait until history and both live channels are in
    pub async fn start_ready(hub: &LoopbackHub, user: &str) -> Result<Self> {
        let mut client = Self::start(hub, user).await?;
        client
            .wait_for_update(|u| matches!(u, SyncUpdate::HistoryLoaded { .. }))
            .await?;
        client
            .wait_for_view(|v| v.messages_connected && v.presence_connected)
            .await?;
        Ok(client)
    }

    pub fn view(&self) -> SyncView {
        self.handle.view()
    }

    /// Wait until the view satisfies `predicate`
    pub async fn wait_for_view(&self, mut predicate: impl FnMut(&SyncView) -> bool) -> Result<SyncView> {
        let mut rx = self.handle.watch_view();
        let view = timeout(WAIT, async move {
            rx.wait_for(|view| predicate(view)).await.map(|view| view.clone())
        })
        .await
        .context("Timed out waiting for view")??;
        Ok(view)
    }

    /// Wait for the next update matching `predicate`, skipping others
    pub async fn wait_for_update(
        &mut self,
        mut predicate: impl FnMut(&SyncUpdate) -> bool,
    ) -> Result<SyncUpdate> {
        let updates = &mut self.updates;
        timeout(WAIT, async move {
            loop {
                match updates.recv().await {
                    Ok(update) if predicate(&update) => return Ok(update),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(e) => return Err(anyhow::Error::from(e)),
                }
            }
        })
        .await
        .context("Timed out waiting for update")?
    }

    /// Every update received so far
    pub fn drain_updates(&mut self) -> Vec<SyncUpdate> {
        let mut drained = Vec::new();
        loop {
            match self.updates.try_recv() {
                Ok(update) => drained.push(update),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return drained,
            }
        }
    }
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) -> Result<()> {
    timeout(WAIT, async move {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("Condition never held")
}

/// Run `future` under [`WAIT`]
pub async fn within<F: Future>(future: F) -> Result<F::Output> {
    timeout(WAIT, future).await.context("Timed out")
}
