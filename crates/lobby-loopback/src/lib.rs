//! # lobby-loopback
//!
//! In-process implementation of every collaborator the sync engine talks to:
//! identity, history API, live message feed, presence channel and send.
//!
//! Several clients wired to one [`LoopbackHub`] see each other's messages and
//! presence, which makes the hub suitable for the demo client and for
//! end-to-end tests. Failures, redelivery and slow history fetches can be
//! switched on to exercise the engine's degraded paths.

mod fault;
mod hub;
mod identity;
mod presence;

pub use fault::Fault;
pub use hub::LoopbackHub;
pub use identity::LoopbackIdentity;
pub use presence::LoopbackPublisher;
