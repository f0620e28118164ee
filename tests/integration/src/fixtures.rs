//! Test fixtures and data generators
//!
//! Provides reusable room data for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use lobby_core::{Message, Profile};
use lobby_loopback::LoopbackHub;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub const ADA: &str = "ada";
pub const BOB: &str = "bob";
pub const CY: &str = "cy";

/// Fixed base time for seeded history
pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// Message `secs` seconds after [`base_time`]
pub fn message_at(id: &str, author: &str, content: &str, secs: i64) -> Message {
    Message::new(id, author, content, base_time() + Duration::seconds(secs))
}

/// Message with a fresh id, stamped now
pub fn fresh_message(author: &str, content: &str) -> Message {
    Message::new(format!("live-{}", unique_suffix()), author, content, Utc::now())
}

/// Profiles for the three regular users
pub fn room_profiles() -> Vec<Profile> {
    vec![
        Profile::new(ADA, "Ada Lovelace"),
        Profile::new(BOB, "bob"),
        Profile::new(CY, "Cy"),
    ]
}

/// Hub that knows every regular user and has no history
pub fn empty_room() -> LoopbackHub {
    LoopbackHub::with_profiles(room_profiles())
}

/// Hub with profiles and three stored messages, seeded out of order
pub fn seeded_room() -> LoopbackHub {
    let hub = empty_room();
    hub.seed_message(message_at("m3", ADA, "third", 30));
    hub.seed_message(message_at("m1", BOB, "first", 10));
    hub.seed_message(message_at("m2", CY, "second", 20));
    hub
}
