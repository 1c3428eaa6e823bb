use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::todo::{ChangeEvent, UserId};

/// One open listener on the change feed. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    owner: UserId,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(owner: UserId, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        tracing::debug!(%owner, "feed subscribed");
        Self { owner, rx }
    }

    pub fn owner(&self) -> UserId { self.owner }

    /// Waits for the next event for this owner. `None` once the feed is gone;
    /// there is no reconnect.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.owner() == self.owner => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(owner = %self.owner, skipped, "feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.owner() == self.owner => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(owner = %self.owner, skipped, "feed subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(owner = %self.owner, "feed unsubscribed");
    }
}
