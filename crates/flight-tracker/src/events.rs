//! Event bus for system-wide event distribution

use flight_core::Event;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Event bus for distributing events across the system
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast sender for events
    sender: broadcast::Sender<Event>,
    /// Event counter
    event_count: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self {
            sender,
            event_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) {
        let total = self.event_count.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.sender.send(event);

        debug!("Event published, total: {}", total);
    }

    /// Get event count
    pub fn get_event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_core::FlightId;

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new(100);
        assert_eq!(bus.get_event_count(), 0);
    }

    #[test]
    fn test_event_publishing_without_subscribers() {
        let bus = EventBus::new(100);

        bus.publish(Event::flight_landed(FlightId::new("AA1"), Some(96.0)));

        assert_eq!(bus.get_event_count(), 1);
    }

    #[test]
    fn test_event_count() {
        let bus = EventBus::new(100);

        for i in 0..5 {
            bus.publish(Event::flight_landed(FlightId::new(format!("AA{i}")), None));
        }

        assert_eq!(bus.get_event_count(), 5);
    }

    #[tokio::test]
    async fn test_subscription() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(Event::flight_archived(FlightId::new("AA1"), 3, 45.0, false));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.flight_id().as_str(), "AA1");
    }
}
