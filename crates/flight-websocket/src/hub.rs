//! WebSocket connection hub
//!
//! Manages all connected WebSocket clients, their flight subscriptions,
//! and event broadcasting.

use flight_core::{Event, FlightId};

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Broadcast channel capacity
const BROADCAST_CAPACITY: usize = 1024;

/// WebSocket connection hub
pub struct WebSocketHub {
    /// Broadcast sender for events
    broadcast_tx: broadcast::Sender<Event>,
    /// Connected clients
    clients: DashMap<Uuid, ClientState>,
    /// Total message count
    message_count: AtomicUsize,
    /// Last known number of active flights, reported in the welcome message
    active_flights: AtomicUsize,
}

/// State for a connected client
#[derive(Debug)]
struct ClientState {
    /// Subscribed flight IDs (None = all)
    subscriptions: Option<HashSet<FlightId>>,
    /// Connection timestamp
    connected_at: chrono::DateTime<chrono::Utc>,
}

impl WebSocketHub {
    /// Create a new WebSocket hub
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            broadcast_tx,
            clients: DashMap::new(),
            message_count: AtomicUsize::new(0),
            active_flights: AtomicUsize::new(0),
        }
    }

    /// Register a new client and return a broadcast receiver
    pub fn register_client(&self, client_id: Uuid) -> broadcast::Receiver<Event> {
        let state = ClientState {
            subscriptions: None,
            connected_at: chrono::Utc::now(),
        };

        self.clients.insert(client_id, state);
        info!("Client {} registered ({} total)", client_id, self.clients.len());

        self.broadcast_tx.subscribe()
    }

    /// Unregister a client
    pub fn unregister_client(&self, client_id: Uuid) {
        if let Some((_, state)) = self.clients.remove(&client_id) {
            let connected_for = chrono::Utc::now().signed_duration_since(state.connected_at);
            info!(
                "Client {} unregistered after {}s ({} remaining)",
                client_id,
                connected_for.num_seconds(),
                self.clients.len()
            );
        }
    }

    /// Get number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Broadcast an event to all clients; filtering happens per connection
    pub fn broadcast(&self, event: Event) {
        self.message_count.fetch_add(1, Ordering::Relaxed);

        // Drops if no receivers
        let _ = self.broadcast_tx.send(event);
    }

    /// Subscribe client to specific flights (None = all flights)
    pub fn subscribe(&self, client_id: Uuid, flight_ids: Option<Vec<FlightId>>) {
        if let Some(mut client) = self.clients.get_mut(&client_id) {
            client.subscriptions = flight_ids.map(|ids| ids.into_iter().collect());
            debug!("Client {} subscriptions updated", client_id);
        }
    }

    /// Unsubscribe client from specific flights (None = everything)
    pub fn unsubscribe(&self, client_id: Uuid, flight_ids: Option<Vec<FlightId>>) {
        if let Some(mut client) = self.clients.get_mut(&client_id) {
            match flight_ids {
                Some(ids) => {
                    if let Some(ref mut subs) = client.subscriptions {
                        for id in &ids {
                            subs.remove(id);
                        }
                    }
                }
                None => client.subscriptions = Some(HashSet::new()),
            }
            debug!("Client {} unsubscribed", client_id);
        }
    }

    /// Whether an event should be forwarded to a client
    pub fn wants(&self, client_id: Uuid, event: &Event) -> bool {
        self.clients.get(&client_id).is_some_and(|client| {
            client
                .subscriptions
                .as_ref()
                .is_none_or(|subs| subs.contains(event.flight_id()))
        })
    }

    pub fn set_active_flights(&self, count: usize) {
        self.active_flights.store(count, Ordering::Relaxed);
    }

    pub fn active_flights(&self) -> usize {
        self.active_flights.load(Ordering::Relaxed)
    }

    /// Get total messages broadcast
    pub fn message_count(&self) -> usize {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Check if a specific client is connected
    pub fn is_client_connected(&self, client_id: Uuid) -> bool {
        self.clients.contains_key(&client_id)
    }
}

impl Default for WebSocketHub {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn landed(flight: &str) -> Event {
        Event::flight_landed(FlightId::new(flight), Some(97.0))
    }

    #[test]
    fn test_client_registration() {
        let hub = WebSocketHub::new();
        let id = Uuid::new_v4();

        let _rx = hub.register_client(id);
        assert_eq!(hub.client_count(), 1);
        assert!(hub.is_client_connected(id));

        hub.unregister_client(id);
        assert_eq!(hub.client_count(), 0);
        assert!(!hub.is_client_connected(id));
    }

    #[test]
    fn test_subscriptions() {
        let hub = WebSocketHub::new();
        let id = Uuid::new_v4();

        let _rx = hub.register_client(id);
        assert!(hub.wants(id, &landed("AA1")));

        hub.subscribe(id, Some(vec![FlightId::new("AA1"), FlightId::new("UA2")]));
        assert!(hub.wants(id, &landed("AA1")));
        assert!(!hub.wants(id, &landed("DL3")));

        hub.unsubscribe(id, Some(vec![FlightId::new("AA1")]));
        assert!(!hub.wants(id, &landed("AA1")));
        assert!(hub.wants(id, &landed("UA2")));

        hub.unsubscribe(id, None);
        assert!(!hub.wants(id, &landed("UA2")));

        hub.subscribe(id, None);
        assert!(hub.wants(id, &landed("DL3")));

        hub.unregister_client(id);
        assert!(!hub.wants(id, &landed("DL3")));
    }

    #[test]
    fn test_broadcast_message_count() {
        let hub = WebSocketHub::new();
        let id = Uuid::new_v4();
        let mut rx = hub.register_client(id);

        assert_eq!(hub.message_count(), 0);
        hub.broadcast(landed("AA1"));
        assert_eq!(hub.message_count(), 1);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.flight_id().as_str(), "AA1");
    }
}
