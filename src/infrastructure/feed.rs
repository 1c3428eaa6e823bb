use tokio::sync::broadcast;

use crate::domain::feed::Subscription;
use crate::domain::repository::ChangeFeed;
use crate::domain::todo::{ChangeEvent, UserId};

pub const FEED_CAPACITY: usize = 256;

/// In-process change feed. Writers publish every committed row change; each
/// subscription only sees its owner's events.
#[derive(Clone)]
pub struct BroadcastFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No listeners is not an error.
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

impl Default for BroadcastFeed {
    fn default() -> Self { Self::new(FEED_CAPACITY) }
}

impl ChangeFeed for BroadcastFeed {
    fn subscribe(&self, owner: UserId) -> anyhow::Result<Subscription> {
        Ok(Subscription::new(owner, self.tx.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::todo::TodoId;

    #[tokio::test]
    async fn subscription_only_sees_its_owner() {
        let feed = BroadcastFeed::default();
        let alice = UserId(uuid::Uuid::new_v4());
        let bob = UserId(uuid::Uuid::new_v4());
        let mut sub = feed.subscribe(alice).unwrap();

        feed.publish(ChangeEvent::Delete { id: TodoId::default(), owner: bob });
        let mine = ChangeEvent::Delete { id: TodoId::default(), owner: alice };
        feed.publish(mine.clone());

        assert_eq!(sub.recv().await, Some(mine));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let feed = BroadcastFeed::default();
        let sub = feed.subscribe(UserId(uuid::Uuid::new_v4())).unwrap();
        assert_eq!(feed.subscriber_count(), 1);
        drop(sub);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = BroadcastFeed::default();
        let mut sub = feed.subscribe(UserId(uuid::Uuid::new_v4())).unwrap();
        drop(feed);
        assert_eq!(sub.recv().await, None);
    }
}
