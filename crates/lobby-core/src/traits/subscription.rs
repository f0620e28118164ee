//! Subscription handle
//!
//! A subscription owns the receiving end of an unbounded channel. Dropping it
//! releases the subscription; the producing side observes this through
//! [`SubscriptionSender::is_released`].

use tokio::sync::mpsc;

/// Receiving end held by the subscriber
#[derive(Debug)]
pub struct Subscription<T> {
    events: mpsc::UnboundedReceiver<T>,
}

/// Producing end held by the transport
#[derive(Debug)]
pub struct SubscriptionSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Subscription<T> {
    /// Create a connected sender/subscription pair
    #[must_use]
    pub fn channel() -> (SubscriptionSender<T>, Self) {
        let (tx, events) = mpsc::unbounded_channel();
        (SubscriptionSender { tx }, Self { events })
    }

    /// Wait for the next event; `None` once the producer is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.events.recv().await
    }

    /// Take an already delivered event without waiting
    pub fn try_recv(&mut self) -> Option<T> {
        self.events.try_recv().ok()
    }
}

impl<T> SubscriptionSender<T> {
    /// Deliver an event; returns `false` if the subscriber has released
    pub fn send(&self, event: T) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Check whether the subscriber has released the subscription
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the subscriber releases the subscription
    pub async fn released(&self) {
        self.tx.closed().await;
    }
}

impl<T> Clone for SubscriptionSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}
