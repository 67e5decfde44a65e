//! The in-process broadcast event bus.

use crate::event::CourierEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts [`CourierEvent`]s to every connected [`EventReceiver`].
///
/// Cloning an `EventBus` shares the same underlying channel — it is the
/// handle type passed around the daemon, not a fresh bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<CourierEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers, returning how many received it.
    ///
    /// Zero receivers is an expected, non-error outcome: the HTTP admin
    /// surface may not have any open listeners at the moment a run completes.
    pub fn publish(&self, event: CourierEvent) -> usize {
        let event = Arc::new(event);
        trace!(event_type = event.event_type(), "publishing event");
        match self.sender.send(Arc::clone(&event)) {
            Ok(count) => {
                debug!(event_type = event.event_type(), receiver_count = count, "event published");
                count
            }
            Err(_) => {
                trace!(event_type = event.event_type(), "no receivers for event");
                0
            }
        }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// The current number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The configured channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription handle returned by [`EventBus::subscribe`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<CourierEvent>>,
}

impl EventReceiver {
    /// Receive the next event, transparently skipping past a lag gap.
    ///
    /// Returns `None` only once the bus itself has been dropped.
    pub async fn recv(&mut self) -> Option<Arc<CourierEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<CourierEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventMetadata;
    use chrono::Utc;

    fn sample_event() -> CourierEvent {
        CourierEvent::ScheduledActionFired {
            metadata: EventMetadata::new("scheduler", Utc::now()),
            action_id: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_round_trips() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let count = bus.publish(sample_event());
        assert_eq!(count, 1);
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "scheduled_action_fired");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(sample_event()), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();
        assert_eq!(bus.publish(sample_event()), 2);
        assert!(r1.recv().await.is_some());
        assert!(r2.recv().await.is_some());
    }

    #[tokio::test]
    async fn try_recv_empty_returns_none() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn subscriber_count_tracks_active_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let r1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(r1);
    }
}
