//! End-to-end tests for the message log, authors and sending
//!
//! Run with: cargo test -p integration-tests --test sync_tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use integration_tests::*;
use lobby_common::{Operation, SyncError};
use lobby_core::{
    DomainError, IdentityProvider, Message, MessageId, Profile, Session, UserId, MAX_CONTENT_CHARS,
};
use lobby_loopback::{Fault, LoopbackIdentity};
use lobby_sync::{Collaborators, Stream, SyncController, SyncExit, SyncUpdate};
use tokio::sync::watch;

fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

fn added_count(updates: &[SyncUpdate], id: &str) -> usize {
    updates
        .iter()
        .filter(|u| matches!(u, SyncUpdate::MessageAdded(m) if m.id.as_str() == id))
        .count()
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_history_loads_in_order_with_authors() {
    let hub = seeded_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();

    let view = client.view();
    assert_eq!(ids(&view.messages), ["m1", "m2", "m3"]);
    assert_eq!(view.author(&view.messages[0]).display_name, "bob");
    assert_eq!(view.author(&view.messages[1]).display_name, "Cy");
    assert!(view.messages_connected);
    assert!(view.presence_connected);
}

#[tokio::test(start_paused = true)]
async fn test_history_respects_limit() {
    let hub = seeded_room();
    let config = lobby_common::SyncConfig {
        history_limit: 2,
        ..test_config()
    };

    let client = TestClient::start_with_config(&hub, ADA, config).await.unwrap();
    let view = client.wait_for_view(|v| !v.messages.is_empty()).await.unwrap();

    // The most recent two, still ascending
    assert_eq!(ids(&view.messages), ["m2", "m3"]);
}

#[tokio::test(start_paused = true)]
async fn test_start_without_session_fails() {
    let hub = empty_room();
    let identity = Arc::new(LoopbackIdentity::signed_out());

    let result = SyncController::start(test_config(), collaborators(&hub, identity).unwrap()).await;

    assert!(matches!(result, Err(SyncError::NoSession)));
    assert_eq!(hub.feed_subscribers(), 0);
    assert_eq!(hub.presence_members(TOPIC), 0);
}

#[tokio::test(start_paused = true)]
async fn test_history_failure_is_a_notice() {
    let hub = seeded_room();
    hub.set_fault(Fault::FetchMessages, true);
    let mut client = TestClient::start(&hub, ADA).await.unwrap();

    let update = client
        .wait_for_update(|u| matches!(u, SyncUpdate::Notice(_)))
        .await
        .unwrap();
    let SyncUpdate::Notice(notice) = update else { unreachable!() };
    assert_eq!(notice.code, "TRANSPORT_UNAVAILABLE");
    assert_eq!(notice.title, Operation::FetchMessages.title());

    // Live delivery still works
    hub.insert(fresh_message(BOB, "still here"));
    let view = client.wait_for_view(|v| v.messages.len() == 1).await.unwrap();
    assert_eq!(view.messages[0].content, "still here");
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_failure_keeps_history() {
    let hub = seeded_room();
    hub.set_fault(Fault::Subscribe, true);
    let mut client = TestClient::start(&hub, ADA).await.unwrap();

    let update = client
        .wait_for_update(|u| matches!(u, SyncUpdate::Notice(_)))
        .await
        .unwrap();
    let SyncUpdate::Notice(notice) = update else { unreachable!() };
    assert_eq!(notice.title, Operation::SubscribeMessages.title());

    let view = client.wait_for_view(|v| v.messages.len() == 3).await.unwrap();
    assert!(!view.messages_connected);
}

// ============================================================================
// Live messages
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_redelivered_message_appears_once() {
    let hub = seeded_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();
    client.drain_updates();

    hub.set_redelivery(true);
    hub.insert(message_at("m4", BOB, "twice", 40));
    hub.set_redelivery(false);
    // Feed order guarantees both copies are handled before the marker
    hub.insert(message_at("m5", BOB, "marker", 50));
    let view = client.wait_for_view(|v| v.messages.len() == 5).await.unwrap();

    assert_eq!(ids(&view.messages), ["m1", "m2", "m3", "m4", "m5"]);
    let updates = client.drain_updates();
    assert_eq!(added_count(&updates, "m4"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_messages_merge_with_slow_history() {
    let hub = seeded_room();
    hub.set_history_delay(Some(Duration::from_secs(2)));
    let mut client = TestClient::start(&hub, ADA).await.unwrap();
    client
        .wait_for_view(|v| v.messages_connected)
        .await
        .unwrap();

    // One new message and one the history batch will also carry
    hub.deliver(message_at("m25", BOB, "in between", 25));
    hub.deliver(message_at("m3", ADA, "third", 30));
    client.wait_for_view(|v| v.messages.len() == 2).await.unwrap();

    client
        .wait_for_update(|u| matches!(u, SyncUpdate::HistoryLoaded { .. }))
        .await
        .unwrap();
    let view = client.view();
    assert_eq!(ids(&view.messages), ["m1", "m2", "m25", "m3"]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_delivery_stays_sorted() {
    let hub = empty_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();

    hub.deliver(message_at("b", BOB, "later", 20));
    hub.deliver(message_at("a", BOB, "earlier", 10));
    // Same timestamp as "b"; the id breaks the tie
    hub.deliver(message_at("c", CY, "tie", 20));

    let view = client.wait_for_view(|v| v.messages.len() == 3).await.unwrap();
    assert_eq!(ids(&view.messages), ["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_author_resolves_once_profile_exists() {
    let hub = empty_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();

    hub.insert(fresh_message("zed", "who am I"));
    let update = client
        .wait_for_update(|u| matches!(u, SyncUpdate::AuthorResolved { .. }))
        .await
        .unwrap();
    let SyncUpdate::AuthorResolved { profile, .. } = update else { unreachable!() };
    assert!(profile.is_unknown());

    // Unknown is not cached; the next message looks again
    hub.add_profile(Profile::new("zed", "Zed"));
    let second = fresh_message("zed", "now with a name");
    hub.insert(second.clone());
    let update = client
        .wait_for_update(|u| matches!(u, SyncUpdate::AuthorResolved { .. }))
        .await
        .unwrap();
    let SyncUpdate::AuthorResolved { message_id, profile } = update else { unreachable!() };
    assert_eq!(message_id, second.id);
    assert_eq!(profile.display_name, "Zed");
    assert_eq!(client.view().author(&second).display_name, "Zed");
}

#[tokio::test(start_paused = true)]
async fn test_known_author_needs_no_lookup() {
    let hub = seeded_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();
    client.drain_updates();

    // bob already authored history
    hub.insert(message_at("m9", BOB, "again", 90));
    client.wait_for_view(|v| v.messages.len() == 4).await.unwrap();
    hub.insert(message_at("m10", BOB, "marker", 100));
    client.wait_for_view(|v| v.messages.len() == 5).await.unwrap();

    let updates = client.drain_updates();
    assert!(!updates
        .iter()
        .any(|u| matches!(u, SyncUpdate::AuthorResolved { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_feed_state_changes_are_reported() {
    let hub = empty_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();

    hub.set_feed_state(lobby_core::ChannelState::Errored);

    let update = client
        .wait_for_update(|u| {
            matches!(
                u,
                SyncUpdate::ConnectionChanged {
                    stream: Stream::Messages,
                    ..
                }
            )
        })
        .await
        .unwrap();
    assert!(matches!(
        update,
        SyncUpdate::ConnectionChanged {
            state: lobby_core::ChannelState::Errored,
            ..
        }
    ));
    assert!(!client.view().messages_connected);
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_reaches_every_client() {
    let hub = empty_room();
    let mut ada = TestClient::start_ready(&hub, ADA).await.unwrap();
    let bob = TestClient::start_ready(&hub, BOB).await.unwrap();

    ada.handle.send("hello bob").await.unwrap();

    ada.wait_for_update(|u| matches!(u, SyncUpdate::SendSucceeded))
        .await
        .unwrap();
    let view = bob.wait_for_view(|v| v.messages.len() == 1).await.unwrap();
    assert_eq!(view.messages[0].content, "hello bob");
    assert_eq!(view.messages[0].author_id, UserId::from(ADA));
    ada.wait_for_view(|v| v.messages.len() == 1).await.unwrap();
    assert_eq!(hub.messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_returns_content() {
    let hub = empty_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();
    hub.set_fault(Fault::SendMessage, true);

    let result = client.handle.send("keep me").await;

    assert!(matches!(
        result,
        Err(SyncError::Transport {
            operation: Operation::SendMessage,
            ..
        })
    ));
    let update = client
        .wait_for_update(|u| matches!(u, SyncUpdate::SendFailed { .. }))
        .await
        .unwrap();
    let SyncUpdate::SendFailed { content, notice } = update else { unreachable!() };
    assert_eq!(content, "keep me");
    assert_eq!(notice.title, "Failed to send message");
    assert!(hub.messages().is_empty());
    assert!(client.view().messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_drafts_are_refused() {
    let hub = empty_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();

    let empty = client.handle.send("   \n").await;
    assert!(matches!(empty, Err(SyncError::Domain(DomainError::ContentEmpty))));

    let notice = client
        .wait_for_update(|u| matches!(u, SyncUpdate::Notice(_)))
        .await
        .unwrap();
    let SyncUpdate::Notice(notice) = notice else { unreachable!() };
    assert_eq!(notice.code, "CONTENT_EMPTY");

    let long = "x".repeat(MAX_CONTENT_CHARS + 1);
    let too_long = client.handle.send(long).await;
    assert!(matches!(
        too_long,
        Err(SyncError::Domain(DomainError::ContentTooLong { .. }))
    ));

    // Exactly at the limit is fine
    client
        .handle
        .send("x".repeat(MAX_CONTENT_CHARS))
        .await
        .unwrap();
    assert_eq!(hub.messages().len(), 1);
}

// ============================================================================
// Roster
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_roster_sorted_with_self_and_online_marked() {
    let hub = empty_room();
    let _bob = TestClient::start_ready(&hub, BOB).await.unwrap();
    let ada = TestClient::start_ready(&hub, ADA).await.unwrap();

    let view = ada
        .wait_for_view(|v| {
            v.roster.len() == 3
                && v.is_online(&UserId::from(BOB))
                && v.is_online(&UserId::from(ADA))
        })
        .await
        .unwrap();

    let entries = view.roster_entries();
    let names: Vec<&str> = entries
        .iter()
        .map(|e| e.profile.display_name.as_str())
        .collect();
    assert_eq!(names, ["Ada Lovelace", "bob", "Cy"]);
    assert!(entries[0].is_self && entries[0].online);
    assert!(entries[1].online && !entries[1].is_self);
    assert!(!entries[2].online);
}

#[tokio::test(start_paused = true)]
async fn test_roster_refresh_updates_author_names() {
    let hub = seeded_room();
    let mut client = TestClient::start_ready(&hub, ADA).await.unwrap();
    client
        .wait_for_view(|v| !v.roster.is_empty())
        .await
        .unwrap();

    client.drain_updates();

    hub.add_profile(Profile::new(BOB, "Robert"));
    client.handle.refresh_roster().unwrap();
    client
        .wait_for_update(|u| matches!(u, SyncUpdate::RosterRefreshed))
        .await
        .unwrap();

    let view = client.view();
    let first = &view.messages[0];
    assert_eq!(first.id, MessageId::from("m1"));
    assert_eq!(view.author(first).display_name, "Robert");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_out_ends_session() {
    let hub = empty_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();
    assert_eq!(hub.feed_subscribers(), 1);

    client.identity.sign_out();
    let exit = within(client.handle.join()).await.unwrap().unwrap();

    assert_eq!(exit, SyncExit::SessionEnded);
    assert_eq!(hub.feed_subscribers(), 0);
    eventually(|| hub.presence_members(TOPIC) == 0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_switching_user_ends_session() {
    let hub = empty_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();

    client.identity.sign_in(BOB);
    let exit = within(client.handle.join()).await.unwrap().unwrap();

    assert_eq!(exit, SyncExit::SessionEnded);
}

#[tokio::test(start_paused = true)]
async fn test_identity_handed_off_keeps_session() {
    let hub = seeded_room();
    let collaborators = collaborators(&hub, Arc::new(LoopbackIdentity::signed_in(ADA))).unwrap();
    let handle = SyncController::start(test_config(), collaborators).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    eventually(|| handle.view().messages.len() == 3).await.unwrap();

    assert!(!handle.is_finished());
    assert!(handle.local_input().is_ok());
    within(handle.send("still here")).await.unwrap().unwrap();
    assert_eq!(hub.messages().len(), 4);
}

/// Provider that answers once and never reports a change
struct FixedSession(Session);

#[async_trait]
impl IdentityProvider for FixedSession {
    async fn current_session(&self) -> Option<Session> {
        Some(self.0.clone())
    }

    fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        let (_, rx) = watch::channel(Some(self.0.clone()));
        rx
    }
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_watch_is_not_a_sign_out() {
    let hub = seeded_room();
    let hub_api = Arc::new(hub.clone());
    let collaborators = Collaborators::builder()
        .identity(Arc::new(FixedSession(Session::new(ADA))))
        .history(hub_api.clone())
        .feed(hub_api.clone())
        .presence(hub_api.clone())
        .sender(hub_api)
        .build()
        .unwrap();
    let handle = SyncController::start(test_config(), collaborators).await.unwrap();

    eventually(|| handle.view().messages.len() == 3).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!handle.is_finished());
    let exit = within(handle.shutdown()).await.unwrap().unwrap();
    assert_eq!(exit, SyncExit::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_everything() {
    let hub = empty_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();
    let view_rx = client.handle.watch_view();

    let exit = within(client.handle.shutdown()).await.unwrap().unwrap();

    assert_eq!(exit, SyncExit::Shutdown);
    assert_eq!(hub.feed_subscribers(), 0);
    assert!(hub.presence_records(TOPIC).is_empty());
    let last = view_rx.borrow().clone();
    assert!(!last.messages_connected && !last.presence_connected);
    assert!(last.online.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_stop_report_stopped() {
    let hub = empty_room();
    let client = TestClient::start_ready(&hub, ADA).await.unwrap();
    let handle = client.handle;

    client.identity.sign_out();
    eventually(|| handle.is_finished()).await.unwrap();

    assert!(matches!(handle.local_input(), Err(SyncError::Stopped)));
    assert!(matches!(handle.send("late").await, Err(SyncError::Stopped)));
}
