//! Message log

mod message_store;

pub use message_store::MessageStore;
