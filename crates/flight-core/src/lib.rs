//! # Flight Core
//!
//! Core domain models and types for the Flight Tracking System.
//! This crate provides the shared types, geographic math and inbound
//! report validation used by every other crate in the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod airports;
pub mod error;
pub mod events;
pub mod geo;
pub mod validate;

pub use airports::Airport;
pub use error::{ValidationError, ValidationResult};
pub use events::*;
pub use geo::*;
pub use validate::{parse_timestamp, validate_report, validate_report_at};

/// Status value with state-machine meaning: the flight is a completion candidate
pub const LANDED_STATUS: &str = "landed";

/// Placeholder used in archive summaries for absent descriptive fields
pub const UNKNOWN: &str = "Unknown";

// ============================================================================
// FLIGHT MODELS
// ============================================================================

/// Unique identifier for a flight
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightId(pub String);

impl FlightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FlightId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FlightId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Optional descriptive fields a reporter may attach to a position report.
///
/// Airport codes are not checked against the airport table; unknown codes
/// simply yield no route geometry downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<serde_json::Value>,
}

impl FlightDetails {
    /// Origin airport code: `source`, falling back to `departure`
    pub fn source_code(&self) -> Option<&str> {
        self.source.as_deref().or(self.departure.as_deref())
    }

    /// Destination airport code: `destination`, falling back to `arrival`
    pub fn destination_code(&self) -> Option<&str> {
        self.destination.as_deref().or(self.arrival.as_deref())
    }

    /// Overwrite every field present in `newer`, keep the rest
    pub fn merge_from(&mut self, newer: &FlightDetails) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        set(&mut self.source, &newer.source);
        set(&mut self.destination, &newer.destination);
        set(&mut self.departure, &newer.departure);
        set(&mut self.arrival, &newer.arrival);
        set(&mut self.aircraft_type, &newer.aircraft_type);
        set(&mut self.airline, &newer.airline);
        set(&mut self.route, &newer.route);
    }
}

/// A validated position report.
///
/// `received_at` is assigned by the server during validation and is never
/// taken from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub flight_id: FlightId,
    #[serde(flatten)]
    pub position: Coordinate,
    /// Altitude in feet
    pub altitude: f64,
    /// Ground speed in knots
    pub speed: f64,
    /// Heading in degrees (0-360)
    pub heading: f64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: FlightDetails,
}

/// One sample of a flight's history: the report exactly as accepted
pub type TrackPoint = PositionReport;

/// Latest known state of an active flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub flight_id: FlightId,
    #[serde(flatten)]
    pub position: Coordinate,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub status: String,
    /// Timestamp carried by the latest report
    pub last_updated: DateTime<Utc>,
    /// Server clock when the latest report was accepted
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: FlightDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_progress: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ready_for_completion: bool,
}

impl FlightState {
    /// Create the state for a flight's first report
    pub fn from_report(report: &PositionReport) -> Self {
        Self {
            flight_id: report.flight_id.clone(),
            position: report.position,
            altitude: report.altitude,
            speed: report.speed,
            heading: report.heading,
            status: report.status.clone(),
            last_updated: report.timestamp,
            received_at: report.received_at,
            details: report.details.clone(),
            route_progress: None,
            ready_for_completion: false,
        }
    }

    /// Apply a newer report: mandatory fields are replaced, optional fields
    /// only when the report carries them. Arrival order wins, not timestamp order.
    pub fn absorb(&mut self, report: &PositionReport) {
        self.position = report.position;
        self.altitude = report.altitude;
        self.speed = report.speed;
        self.heading = report.heading;
        self.status = report.status.clone();
        self.last_updated = report.timestamp;
        self.received_at = report.received_at;
        self.details.merge_from(&report.details);
    }

    pub fn is_landed(&self) -> bool {
        self.status == LANDED_STATUS
    }

    /// Force the landed status and flag the flight for archival.
    /// The flag is never cleared until the flight is archived.
    pub fn mark_landed(&mut self) {
        self.status = LANDED_STATUS.to_string();
        self.ready_for_completion = true;
    }

    /// Whether a sweep should archive this flight
    pub fn is_completion_candidate(&self, landed_threshold: f64) -> bool {
        self.is_landed()
            || self.ready_for_completion
            || self.route_progress.is_some_and(|p| p >= landed_threshold)
    }

    /// Exact match on both resolved airport codes
    pub fn flies_route(&self, source: &str, destination: &str) -> bool {
        self.details.source_code() == Some(source)
            && self.details.destination_code() == Some(destination)
    }
}

// ============================================================================
// ARCHIVE MODELS
// ============================================================================

/// Route summary recorded by automatic completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub source: String,
    pub destination: String,
    pub final_progress: f64,
}

/// Flight summary recorded by automatic completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSummary {
    pub aircraft_type: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    /// Sum of distances between consecutive track points
    pub total_distance_km: f64,
}

/// Immutable record of a finished flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedFlightLog {
    pub id: Uuid,
    pub flight_id: FlightId,
    pub path: Vec<TrackPoint>,
    pub flight_details: Option<FlightState>,
    pub completed_at: DateTime<Utc>,
    pub total_tracking_points: usize,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_duration_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_summary: Option<FlightSummary>,
}

impl CompletedFlightLog {
    /// Build a log from a flight's ordered track (ascending timestamps)
    pub fn new(
        flight_id: FlightId,
        path: Vec<TrackPoint>,
        flight_details: Option<FlightState>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let departure_time = path.first().map(|p| p.timestamp);
        let arrival_time = path.last().map(|p| p.timestamp);

        let total_duration_minutes = match (departure_time, arrival_time) {
            (Some(start), Some(end)) if path.len() > 1 => {
                let millis = end.signed_duration_since(start).num_milliseconds();
                round2(millis as f64 / 60_000.0)
            }
            _ => 0.0,
        };

        Self {
            id: Uuid::new_v4(),
            flight_id,
            total_tracking_points: path.len(),
            path,
            flight_details,
            completed_at,
            departure_time,
            arrival_time,
            total_duration_minutes,
            auto_completed: None,
            route: None,
            flight_summary: None,
        }
    }

    /// Tag the log as produced by a sweep and attach route and flight summaries
    pub fn with_auto_completion(mut self) -> Self {
        let details = self.flight_details.as_ref().map(|f| &f.details);
        let text = |value: Option<&str>| value.unwrap_or(UNKNOWN).to_string();

        let source = text(details.and_then(|d| d.source_code()));
        let destination = text(details.and_then(|d| d.destination_code()));

        self.route = Some(RouteSummary {
            source: source.clone(),
            destination: destination.clone(),
            final_progress: self
                .flight_details
                .as_ref()
                .and_then(|f| f.route_progress)
                .unwrap_or(0.0),
        });

        self.flight_summary = Some(FlightSummary {
            aircraft_type: text(details.and_then(|d| d.aircraft_type.as_deref())),
            airline: text(details.and_then(|d| d.airline.as_deref())),
            departure_airport: source,
            arrival_airport: destination,
            total_distance_km: path_distance(self.path.iter().map(|p| &p.position)),
        });

        self.auto_completed = Some(true);
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(flight: &str, lat: f64, lon: f64, minute: u32) -> PositionReport {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap();
        PositionReport {
            flight_id: FlightId::new(flight),
            position: Coordinate::new(lat, lon),
            altitude: 35000.0,
            speed: 450.0,
            heading: 270.0,
            status: "en-route".into(),
            timestamp,
            received_at: timestamp,
            details: FlightDetails::default(),
        }
    }

    #[test]
    fn test_flight_id() {
        let id = FlightId::new("AA123");
        assert_eq!(id.as_str(), "AA123");
        assert_eq!(id.to_string(), "AA123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"AA123\"");
    }

    #[test]
    fn test_absorb_keeps_absent_optional_fields() {
        let mut first = report("AA123", 40.0, -73.0, 0);
        first.details.source = Some("JFK".into());
        first.details.airline = Some("Delta".into());

        let mut state = FlightState::from_report(&first);

        let mut second = report("AA123", 39.0, -80.0, 5);
        second.details.airline = Some("United".into());
        second.status = "cruising".into();
        state.absorb(&second);

        assert_eq!(state.position, Coordinate::new(39.0, -80.0));
        assert_eq!(state.status, "cruising");
        assert_eq!(state.details.source.as_deref(), Some("JFK"));
        assert_eq!(state.details.airline.as_deref(), Some("United"));
        assert_eq!(state.last_updated, second.timestamp);
    }

    #[test]
    fn test_code_fallbacks() {
        let details = FlightDetails {
            departure: Some("ORD".into()),
            arrival: Some("DEN".into()),
            destination: Some("SFO".into()),
            ..Default::default()
        };
        assert_eq!(details.source_code(), Some("ORD"));
        assert_eq!(details.destination_code(), Some("SFO"));
    }

    #[test]
    fn test_completion_candidate() {
        let mut state = FlightState::from_report(&report("AA1", 0.0, 0.0, 0));
        assert!(!state.is_completion_candidate(95.0));

        state.route_progress = Some(96.0);
        assert!(state.is_completion_candidate(95.0));

        state.route_progress = Some(10.0);
        state.mark_landed();
        assert!(state.is_landed());
        assert!(state.ready_for_completion);
        assert!(state.is_completion_candidate(95.0));
    }

    #[test]
    fn test_flight_state_serialization_is_flat() {
        let state = FlightState::from_report(&report("AA1", 1.5, 2.5, 0));
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["longitude"], 2.5);
        assert!(json.get("ready_for_completion").is_none());
        assert!(json.get("route_progress").is_none());

        let back: FlightState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_log_single_point_has_zero_duration() {
        let path = vec![report("AA1", 0.0, 0.0, 0)];
        let log = CompletedFlightLog::new(FlightId::new("AA1"), path, None, Utc::now());

        assert_eq!(log.total_tracking_points, 1);
        assert_eq!(log.total_duration_minutes, 0.0);
        assert_eq!(log.departure_time, log.arrival_time);
        assert!(log.auto_completed.is_none());
    }

    #[test]
    fn test_log_empty_path() {
        let log = CompletedFlightLog::new(FlightId::new("AA1"), Vec::new(), None, Utc::now());
        assert!(log.departure_time.is_none());
        assert!(log.arrival_time.is_none());
        assert_eq!(log.total_duration_minutes, 0.0);
    }

    #[test]
    fn test_log_duration_and_summary() {
        let path = vec![
            report("AA1", 40.6413, -73.7781, 0),
            report("AA1", 37.0, -96.0, 20),
            report("AA1", 33.9416, -118.4085, 45),
        ];
        let mut state = FlightState::from_report(&path[2]);
        state.details.source = Some("JFK".into());
        state.details.destination = Some("LAX".into());
        state.route_progress = Some(100.0);

        let log = CompletedFlightLog::new(FlightId::new("AA1"), path, Some(state), Utc::now())
            .with_auto_completion();

        assert_eq!(log.total_duration_minutes, 45.0);
        assert_eq!(log.auto_completed, Some(true));

        let route = log.route.as_ref().unwrap();
        assert_eq!(route.source, "JFK");
        assert_eq!(route.final_progress, 100.0);

        let summary = log.flight_summary.as_ref().unwrap();
        assert_eq!(summary.airline, UNKNOWN);
        assert_eq!(summary.arrival_airport, "LAX");
        assert!(summary.total_distance_km > 3974.0);
    }
}
