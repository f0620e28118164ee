//! Demo room: a seeded hub and a scripted peer

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use lobby_common::{SyncConfig, SyncResult};
use lobby_core::{Message, Profile, UserId};
use lobby_loopback::{LoopbackHub, LoopbackIdentity};
use lobby_sync::{Collaborators, SyncController, SyncExit, SyncHandle};
use tokio::sync::oneshot;
use tokio::time::sleep;

/// User id of the scripted peer
pub const PEER_ID: &str = "ada";

const PEER_LINES: &[&str] = &[
    "hi! anyone around?",
    "the loopback hub delivers every message to every feed",
    "try typing, I can see it on my side",
    "ok, back to work. ping me if you need anything",
];

/// Hub with both users' profiles and a short history
pub fn seeded_hub(local_id: &UserId, local_name: &str) -> LoopbackHub {
    let hub = LoopbackHub::with_profiles([
        Profile::new(local_id.clone(), local_name),
        Profile::new(PEER_ID, "Ada Lovelace"),
    ]);

    let now = Utc::now();
    hub.seed_message(Message::new(
        "seed-1",
        PEER_ID,
        "welcome to the lobby",
        now - ChronoDuration::minutes(5),
    ));
    hub.seed_message(Message::new(
        "seed-2",
        local_id.clone(),
        "thanks!",
        now - ChronoDuration::minutes(4),
    ));
    hub
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

/// Run the scripted peer until `stop` fires (or its sender is dropped)
pub async fn run_peer(
    hub: LoopbackHub,
    config: SyncConfig,
    stop: oneshot::Receiver<()>,
) -> SyncResult<SyncExit> {
    let identity = Arc::new(LoopbackIdentity::signed_in(PEER_ID));
    let handle = SyncController::start(config, collaborators(&hub, identity)?).await?;

    tokio::select! {
        () = script(&handle) => {}
        _ = stop => {}
    }

    handle.shutdown().await
}

async fn script(handle: &SyncHandle) {
    for line in PEER_LINES {
        sleep(Duration::from_secs(4)).await;

        // A few keystrokes, then send
        for _ in 0..line.len().min(12) {
            if handle.local_input().is_err() {
                return;
            }
            sleep(Duration::from_millis(150)).await;
        }
        if let Err(e) = handle.send(*line).await {
            tracing::warn!(error = %e, "Peer failed to send");
        }
    }
    // Stay online until stopped
    std::future::pending::<()>().await;
}
