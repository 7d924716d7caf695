//! Event types for the flight tracking system
//!
//! These events are published by the lifecycle manager and fanned out to
//! WebSocket clients and the metrics collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Coordinate, FlightId};

/// Event envelope for all system events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            payload,
        }
    }

    pub fn position_updated(
        flight_id: FlightId,
        position: Coordinate,
        status: String,
        route_progress: Option<f64>,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            EventType::PositionUpdated,
            EventPayload::Position(PositionEvent {
                flight_id,
                position,
                status,
                route_progress,
                reported_at,
            }),
        )
    }

    pub fn flight_landed(flight_id: FlightId, route_progress: Option<f64>) -> Self {
        Self::new(
            EventType::FlightLanded,
            EventPayload::Landed(LandedEvent {
                flight_id,
                route_progress,
            }),
        )
    }

    pub fn flight_archived(
        flight_id: FlightId,
        total_points: usize,
        duration_minutes: f64,
        auto_completed: bool,
    ) -> Self {
        Self::new(
            EventType::FlightArchived,
            EventPayload::Archived(ArchivedEvent {
                flight_id,
                total_points,
                duration_minutes,
                auto_completed,
            }),
        )
    }

    /// Flight this event concerns
    pub fn flight_id(&self) -> &FlightId {
        match &self.payload {
            EventPayload::Position(e) => &e.flight_id,
            EventPayload::Landed(e) => &e.flight_id,
            EventPayload::Archived(e) => &e.flight_id,
        }
    }
}

/// Type of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PositionUpdated,
    FlightLanded,
    FlightArchived,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    Position(PositionEvent),
    Landed(LandedEvent),
    Archived(ArchivedEvent),
}

/// Accepted position report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEvent {
    pub flight_id: FlightId,
    pub position: Coordinate,
    pub status: String,
    pub route_progress: Option<f64>,
    pub reported_at: DateTime<Utc>,
}

/// First crossing of the landed threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandedEvent {
    pub flight_id: FlightId,
    pub route_progress: Option<f64>,
}

/// Flight moved to the completed-flight logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedEvent {
    pub flight_id: FlightId,
    pub total_points: usize,
    pub duration_minutes: f64,
    pub auto_completed: bool,
}

// ============================================================================
// WEBSOCKET MESSAGE TYPES
// ============================================================================

/// Message sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Greeting on connection
    Welcome {
        client_id: String,
        active_flights: usize,
    },
    /// Event update
    Event(Event),
    /// Error message
    Error { code: String, message: String },
    /// Heartbeat/ping
    Ping { timestamp: i64 },
}

/// Message sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Subscribe to specific flights; `None` means all flights
    Subscribe { flight_ids: Option<Vec<FlightId>> },
    /// Unsubscribe from specific flights; `None` clears every subscription
    Unsubscribe { flight_ids: Option<Vec<FlightId>> },
    /// Heartbeat/pong
    Pong { timestamp: i64 },
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::flight_landed(FlightId::new("AA123"), Some(97.5));

        assert_eq!(event.event_type, EventType::FlightLanded);
        assert_eq!(event.flight_id().as_str(), "AA123");
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::position_updated(
            FlightId::new("AA123"),
            Coordinate::new(40.0, -74.0),
            "en-route".into(),
            Some(12.5),
            Utc::now(),
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event_type, EventType::PositionUpdated);
        assert!(json.contains("POSITION_UPDATED"));
    }

    #[test]
    fn test_client_message_parsing() {
        let json = r#"{"type":"Subscribe","payload":{"flight_ids":["AA1","UA2"]}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        match msg {
            ClientMessage::Subscribe { flight_ids } => {
                assert_eq!(flight_ids.unwrap().len(), 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Ping { timestamp: 12345 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("Ping"));
    }
}
