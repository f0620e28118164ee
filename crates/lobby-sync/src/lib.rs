//! # lobby-sync
//!
//! Client-side sync engine for a single realtime chat room.
//!
//! ## Components
//!
//! - **MessageStore**: ordered, deduplicated message log
//! - **ProfileDirectory**: user id to display identity, with a TTL cache
//! - **PresenceTracker**: online and typing sets from full-state snapshots
//! - **TypingBroadcaster**: debounced publishing of the local typing state
//! - **SyncController**: owns all of the above and exposes one view to the UI
//!
//! ## Example
//!
//! ```ignore
//! use lobby_sync::{Collaborators, SyncController, SyncUpdate};
//!
//! let collaborators = Collaborators::builder()
//!     .identity(identity)
//!     .history(history)
//!     .feed(feed)
//!     .presence(presence)
//!     .sender(sender)
//!     .build()?;
//!
//! let mut handle = SyncController::start(SyncConfig::from_env()?, collaborators).await?;
//! let mut updates = handle.updates();
//!
//! handle.local_input()?;
//! handle.send("hello").await?;
//!
//! while let Ok(update) = updates.recv().await {
//!     if let SyncUpdate::MessageAdded(message) = update {
//!         println!("{}", message.content);
//!     }
//! }
//! ```

pub mod controller;
pub mod directory;
pub mod presence;
pub mod store;

// Re-export commonly used types at crate root
pub use controller::{
    Collaborators, CollaboratorsBuilder, RosterEntry, Stream, SyncController, SyncExit,
    SyncHandle, SyncUpdate, SyncView,
};
pub use directory::ProfileDirectory;
pub use presence::{PresenceChange, PresenceTracker, TypingBroadcaster};
pub use store::MessageStore;
