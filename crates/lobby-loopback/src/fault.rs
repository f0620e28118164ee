//! Failure injection

use std::collections::HashSet;

use lobby_core::TransportError;
use parking_lot::Mutex;

/// Hub operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    FetchMessages,
    FetchProfiles,
    SendMessage,
    Subscribe,
    Join,
    Publish,
}

/// Set of currently failing operations
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    active: Mutex<HashSet<Fault>>,
}

impl FaultPlan {
    pub(crate) fn set(&self, fault: Fault, failing: bool) {
        let mut active = self.active.lock();
        if failing {
            active.insert(fault);
        } else {
            active.remove(&fault);
        }
    }

    /// `Err` if `fault` is active
    pub(crate) fn check(&self, fault: Fault) -> Result<(), TransportError> {
        if self.active.lock().contains(&fault) {
            tracing::debug!(?fault, "Injected failure");
            return Err(TransportError::unavailable(format!("injected {fault:?} failure")));
        }
        Ok(())
    }
}
