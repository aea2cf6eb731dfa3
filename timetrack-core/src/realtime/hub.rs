//! # Realtime Fan-out Hub
//!
//! Routes [`HubEvent`]s produced by the timer and entry services to every
//! connected subscriber for a user, and retains a short backlog so polling
//! clients (no WebSocket support, or one that just reconnected) can catch
//! up by cursor instead of losing updates.
//!
//! ## Backpressure
//!
//! Each subscriber gets a bounded [`mpsc::Sender`]. A slow consumer that
//! lets its queue fill is dropped from the fan-out on the next publish
//! rather than blocking everyone else — it still has the backlog and the
//! poll endpoint to recover from.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::domain::events::{EventPayload, HubEvent};

const BACKLOG_CAPACITY: usize = 200;

struct Subscriber {
    id: Uuid,
    sender: mpsc::Sender<HubEvent>,
}

#[derive(Default)]
struct UserChannel {
    subscribers: Vec<Subscriber>,
    backlog: VecDeque<HubEvent>,
    next_seq: u64,
}

#[derive(Clone)]
pub struct Hub {
    channels: Arc<RwLock<HashMap<Uuid, UserChannel>>>,
    queue_capacity: usize,
}

pub struct Subscription {
    pub id: Uuid,
    pub receiver: mpsc::Receiver<HubEvent>,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Self {
        Self { channels: Arc::new(RwLock::new(HashMap::new())), queue_capacity }
    }

    pub async fn subscribe(&self, user_id: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        let mut channels = self.channels.write().await;
        let channel = channels.entry(user_id).or_default();
        channel.subscribers.push(Subscriber { id, sender });
        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, user_id: Uuid, subscription_id: Uuid) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get_mut(&user_id) {
            channel.subscribers.retain(|s| s.id != subscription_id);
        }
    }

    /// Publishes `payload` to `user_id`'s channel, stamping it with the next
    /// sequence number and pushing it to the backlog before fanning out to
    /// live subscribers.
    pub async fn publish(&self, user_id: Uuid, payload: EventPayload) -> HubEvent {
        let mut channels = self.channels.write().await;
        let channel = channels.entry(user_id).or_default();

        channel.next_seq += 1;
        let event = HubEvent { seq: channel.next_seq, user_id, occurred_at: Utc::now(), payload };

        channel.backlog.push_back(event.clone());
        while channel.backlog.len() > BACKLOG_CAPACITY {
            channel.backlog.pop_front();
        }

        channel.subscribers.retain(|sub| match sub.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(user_id = %user_id, subscription_id = %sub.id, "subscriber queue full, evicting slow consumer");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        event
    }

    /// Returns every backlogged event for `user_id` with `seq > since`, for
    /// the polling fallback and for a freshly (re)connected socket's catch-up.
    pub async fn events_since(&self, user_id: Uuid, since: u64) -> Vec<HubEvent> {
        let channels = self.channels.read().await;
        channels
            .get(&user_id)
            .map(|c| c.backlog.iter().filter(|e| e.seq > since).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn current_seq(&self, user_id: Uuid) -> u64 {
        let channels = self.channels.read().await;
        channels.get(&user_id).map(|c| c.next_seq).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EventPayload;

    #[tokio::test]
    async fn test_publish_increments_seq_per_user() {
        let hub = Hub::new(16);
        let user_id = Uuid::new_v4();

        let e1 = hub.publish(user_id, EventPayload::TimerError { code: "x".into(), message: "x".into() }).await;
        let e2 = hub.publish(user_id, EventPayload::TimerError { code: "x".into(), message: "x".into() }).await;

        assert_eq!(e1.seq, 1);
        assert_eq!(e2.seq, 2);
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let hub = Hub::new(16);
        let user_id = Uuid::new_v4();
        let mut sub = hub.subscribe(user_id).await;

        hub.publish(user_id, EventPayload::TimerError { code: "x".into(), message: "x".into() }).await;

        let received = sub.receiver.recv().await.expect("event");
        assert_eq!(received.seq, 1);
    }

    #[tokio::test]
    async fn test_events_since_filters_by_seq() {
        let hub = Hub::new(16);
        let user_id = Uuid::new_v4();

        for _ in 0..3 {
            hub.publish(user_id, EventPayload::TimerError { code: "x".into(), message: "x".into() }).await;
        }

        let events = hub.events_since(user_id, 1).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.seq > 1));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = Hub::new(16);
        let user_id = Uuid::new_v4();
        let sub = hub.subscribe(user_id).await;
        hub.unsubscribe(user_id, sub.id).await;

        hub.publish(user_id, EventPayload::TimerError { code: "x".into(), message: "x".into() }).await;

        let channels = hub.channels.read().await;
        assert!(channels.get(&user_id).unwrap().subscribers.is_empty());
    }
}
