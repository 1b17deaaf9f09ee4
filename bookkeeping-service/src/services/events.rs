//! In-process event bus feeding GraphQL subscriptions.

use crate::models::StateChangeEvent;
use tokio::sync::broadcast;
use tracing::debug;

const BUS_CAPACITY: usize = 256;

/// At-most-once fan-out of state-change events to live subscribers. Lagging
/// receivers drop messages; nothing is persisted here (the outbox is the
/// durable record).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StateChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. A send error just means nobody is
    /// listening right now.
    pub fn publish(&self, event: StateChangeEvent) {
        let receivers = self.sender.receiver_count();
        if self.sender.send(event).is_err() {
            debug!("No live subscribers for event");
        } else {
            debug!(receivers = receivers, "Event published to subscribers");
        }
    }
}
