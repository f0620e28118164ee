//! Integration test utilities for the sync engine
//!
//! Clients run against a shared in-process hub, so every test exercises the
//! full path: hub, collaborators, controller task and view channels.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
