//! Controller task, its handle and the view it maintains

mod collaborators;
mod controller;
mod handle;
mod view;

pub use collaborators::{Collaborators, CollaboratorsBuilder};
pub use controller::SyncController;
pub use handle::SyncHandle;
pub use view::{RosterEntry, Stream, SyncExit, SyncUpdate, SyncView};
