//! Identity provider backed by a watch channel

use async_trait::async_trait;
use lobby_core::{IdentityProvider, Session, UserId};
use tokio::sync::watch;

/// Session holder; sign in and out from tests or the demo
#[derive(Debug)]
pub struct LoopbackIdentity {
    session: watch::Sender<Option<Session>>,
}

impl LoopbackIdentity {
    /// Nobody signed in
    pub fn signed_out() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    /// `user_id` signed in
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        let identity = Self::signed_out();
        identity.sign_in(user_id);
        identity
    }

    pub fn sign_in(&self, user_id: impl Into<UserId>) {
        let session = Session::new(user_id);
        tracing::debug!(user_id = %session.user_id, "Signed in");
        self.session.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Signed out");
        self.session.send_replace(None);
    }
}

#[async_trait]
impl IdentityProvider for LoopbackIdentity {
    async fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }
}
