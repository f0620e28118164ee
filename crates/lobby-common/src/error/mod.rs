//! Error taxonomy and user-facing notices

mod sync_error;

pub use sync_error::{ErrorKind, Notice, Operation, SyncError, SyncResult};
