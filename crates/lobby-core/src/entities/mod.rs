//! Domain entities

mod message;
mod presence;
mod profile;
mod session;

pub use message::{Draft, Message, MAX_CONTENT_CHARS};
pub use presence::PresenceRecord;
pub use profile::{Profile, UNKNOWN_DISPLAY_NAME};
pub use session::Session;
