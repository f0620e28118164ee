//! # lobby-client
//!
//! Terminal front end for the sync engine. Lines typed on stdin are sent as
//! messages (each line also counts as typing activity); updates are printed as
//! they arrive. A scripted peer shares the in-process hub.
//!
//! Commands: `/who` lists the roster, `/refresh` refetches it, `/logout` ends
//! the session, `/quit` exits.

pub mod demo;
pub mod render;

use std::sync::Arc;

use lobby_common::SyncConfig;
use lobby_core::UserId;
use lobby_loopback::LoopbackIdentity;
use lobby_sync::{SyncController, SyncExit, SyncHandle, SyncUpdate, SyncView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot, watch};

/// Client options read from the environment
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_id: UserId,
    pub display_name: String,
}

impl ClientOptions {
    /// `LOBBY_USER` / `LOBBY_USER_NAME`, defaulting to `grace` / `Grace Hopper`
    pub fn from_env() -> Self {
        let user_id = std::env::var("LOBBY_USER").unwrap_or_else(|_| "grace".to_string());
        let display_name =
            std::env::var("LOBBY_USER_NAME").unwrap_or_else(|_| "Grace Hopper".to_string());
        Self {
            user_id: UserId::new(user_id),
            display_name,
        }
    }
}

/// Run the demo until the user quits, logs out or stdin closes
pub async fn run(config: SyncConfig, options: ClientOptions) -> anyhow::Result<SyncExit> {
    let hub = demo::seeded_hub(&options.user_id, &options.display_name);

    let (stop_peer, peer_stop) = oneshot::channel();
    let peer = tokio::spawn(demo::run_peer(hub.clone(), config.clone(), peer_stop));

    let identity = Arc::new(LoopbackIdentity::signed_in(options.user_id.clone()));
    let mut handle =
        SyncController::start(config, demo::collaborators(&hub, identity.clone())?).await?;
    let printer = tokio::spawn(print_updates(handle.updates(), handle.watch_view()));

    println!("signed in as {} ({})", options.display_name, options.user_id);
    println!("type a message and press enter; /who, /refresh, /logout, /quit");

    let exit = input_loop(&handle, &identity).await?;
    let exit = match exit {
        Some(SyncExit::SessionEnded) => handle.join().await?,
        _ => handle.shutdown().await?,
    };

    let _ = stop_peer.send(());
    match peer.await {
        Ok(Ok(peer_exit)) => tracing::debug!(?peer_exit, "Peer stopped"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Peer failed"),
        Err(e) => tracing::warn!(error = %e, "Peer task failed"),
    }
    printer.abort();

    Ok(exit)
}

/// Read stdin until a command ends the session
async fn input_loop(
    handle: &SyncHandle,
    identity: &LoopbackIdentity,
) -> anyhow::Result<Option<SyncExit>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => return Ok(Some(SyncExit::Shutdown)),
            "/logout" => {
                identity.sign_out();
                return Ok(Some(SyncExit::SessionEnded));
            }
            "/who" => {
                for entry in handle.view().roster_entries() {
                    println!("{}", render::roster_line(&entry));
                }
            }
            "/refresh" => handle.refresh_roster()?,
            "" => {}
            text => {
                handle.local_input()?;
                // Failures come back as SendFailed updates
                if let Err(e) = handle.send(text).await {
                    tracing::debug!(error = %e, "Send refused");
                }
            }
        }
        if handle.is_finished() {
            break;
        }
    }
    Ok(None)
}

async fn print_updates(
    mut updates: broadcast::Receiver<SyncUpdate>,
    views: watch::Receiver<SyncView>,
) {
    let mut last_typing: Option<String> = None;

    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Update printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let view = views.borrow().clone();

        match update {
            SyncUpdate::HistoryLoaded { .. } => {
                for message in view.messages.iter() {
                    println!("{}", render::message_line(&view, message));
                }
            }
            SyncUpdate::MessageAdded(message) => {
                println!("{}", render::message_line(&view, &message));
            }
            SyncUpdate::PresenceChanged => {
                let typing = render::typing_line(&view.typing_names());
                if typing != last_typing {
                    if let Some(line) = &typing {
                        println!("  {line}");
                    }
                    last_typing = typing;
                }
            }
            SyncUpdate::SendFailed { notice, .. } | SyncUpdate::Notice(notice) => {
                println!("{}", render::notice_line(&notice));
            }
            SyncUpdate::ConnectionChanged { stream, state } => {
                tracing::info!(?stream, %state, "Connection changed");
            }
            SyncUpdate::AuthorResolved { .. }
            | SyncUpdate::RosterRefreshed
            | SyncUpdate::SendSucceeded => {}
        }
    }
}
