//! Read-side views over flight state, tracks and logs

use chrono::{DateTime, Utc};
use flight_core::{
    airports, waypoints_for_codes, CompletedFlightLog, FlightId, FlightState, LatLon, RouteWaypoint,
    TrackPoint,
};
use flight_db::FlightStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{TrackerConfig, TrackerError, TrackerResult};

/// Airport end of a route view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportView {
    pub code: String,
    pub name: String,
    pub coordinates: LatLon,
}

impl AirportView {
    /// Unknown codes render the code as the name at 0/0
    fn for_code(code: &str) -> Self {
        match airports::lookup(code) {
            Some(airport) => Self {
                code: code.to_string(),
                name: airport.name.to_string(),
                coordinates: airport.position.to_lat_lon(),
            },
            None => Self {
                code: code.to_string(),
                name: code.to_string(),
                coordinates: LatLon::default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteView {
    pub flight_id: FlightId,
    pub source: AirportView,
    pub destination: AirportView,
    pub waypoints: Vec<RouteWaypoint>,
    pub current_progress: f64,
    pub current_position: LatLon,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetStats {
    pub active_flights: usize,
    pub completed_flights: usize,
    pub total_tracking_points: usize,
    pub recent_active: Vec<FlightState>,
    pub recent_completed: Vec<CompletedFlightLog>,
}

/// Track and planned route of an active flight
#[derive(Debug, Clone, Serialize)]
pub struct FlightPath {
    pub flight_id: FlightId,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub tracking_points: Vec<TrackPoint>,
    pub route_waypoints: Vec<RouteWaypoint>,
    pub current_progress: f64,
}

/// Entry of the airport table as served to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AirportInfo {
    pub lat: f64,
    pub lon: f64,
    pub name: &'static str,
}

/// Read-only queries; never writes to the store
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn FlightStore>,
    config: TrackerConfig,
}

impl QueryService {
    pub fn new(store: Arc<dyn FlightStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    pub async fn latest_state(&self, flight_id: &FlightId) -> TrackerResult<FlightState> {
        self.store
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| flight_not_found(flight_id))
    }

    /// Track point with the greatest timestamp at or before `instant`
    pub async fn state_at_time(
        &self,
        flight_id: &FlightId,
        instant: DateTime<Utc>,
    ) -> TrackerResult<TrackPoint> {
        self.store
            .track_points(flight_id)
            .await?
            .into_iter()
            .take_while(|p| p.timestamp <= instant)
            .last()
            .ok_or_else(|| {
                TrackerError::not_found(format!(
                    "No location data found for flight {flight_id} at or before {}",
                    instant.to_rfc3339()
                ))
            })
    }

    pub async fn history(&self, flight_id: &FlightId) -> TrackerResult<Vec<TrackPoint>> {
        let points = self.store.track_points(flight_id).await?;
        if points.is_empty() {
            return Err(TrackerError::not_found(format!(
                "No history found for flight {flight_id}"
            )));
        }
        Ok(points)
    }

    pub async fn route_view(&self, flight_id: &FlightId) -> TrackerResult<RouteView> {
        let state = self.latest_state(flight_id).await?;

        let (Some(source), Some(destination)) = (
            state.details.source_code(),
            state.details.destination_code(),
        ) else {
            return Err(TrackerError::not_found(format!(
                "Route information not available for flight {flight_id}"
            )));
        };

        Ok(RouteView {
            flight_id: state.flight_id.clone(),
            source: AirportView::for_code(source),
            destination: AirportView::for_code(destination),
            waypoints: waypoints_for_codes(source, destination, self.config.waypoint_segments),
            current_progress: state.route_progress.unwrap_or(0.0),
            current_position: state.position.to_lat_lon(),
        })
    }

    pub async fn fleet_stats(&self) -> TrackerResult<FleetStats> {
        let mut active = self.store.list_flights().await?;
        active.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        active.truncate(self.config.recent_limit);

        Ok(FleetStats {
            active_flights: self.store.count_flights().await?,
            completed_flights: self.store.count_logs().await?,
            total_tracking_points: self.store.count_track_points().await?,
            recent_active: active,
            recent_completed: self.store.list_logs(Some(self.config.recent_limit)).await?,
        })
    }

    pub async fn active_flights(&self) -> TrackerResult<Vec<FlightState>> {
        let mut flights = self.store.list_flights().await?;
        flights.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
        Ok(flights)
    }

    /// All completed-flight logs, newest first
    pub async fn completed_logs(&self) -> TrackerResult<Vec<CompletedFlightLog>> {
        Ok(self.store.list_logs(None).await?)
    }

    /// Active flights flying exactly `source` -> `destination`
    pub async fn flights_by_route(
        &self,
        source: &str,
        destination: &str,
    ) -> TrackerResult<Vec<FlightState>> {
        Ok(self
            .active_flights()
            .await?
            .into_iter()
            .filter(|f| f.flies_route(source, destination))
            .collect())
    }

    pub async fn flight_path(&self, flight_id: &FlightId) -> TrackerResult<FlightPath> {
        let state = self.latest_state(flight_id).await?;
        let tracking_points = self.store.track_points(flight_id).await?;

        let source = state.details.source_code().map(str::to_string);
        let destination = state.details.destination_code().map(str::to_string);

        let route_waypoints = match (&source, &destination) {
            (Some(s), Some(d)) => waypoints_for_codes(s, d, self.config.waypoint_segments),
            _ => Vec::new(),
        };

        Ok(FlightPath {
            flight_id: state.flight_id,
            source,
            destination,
            tracking_points,
            route_waypoints,
            current_progress: state.route_progress.unwrap_or(0.0),
        })
    }

    /// The airport table keyed by code
    pub fn airports(&self) -> BTreeMap<&'static str, AirportInfo> {
        airports::all()
            .iter()
            .map(|a| {
                (
                    a.code,
                    AirportInfo {
                        lat: a.position.latitude,
                        lon: a.position.longitude,
                        name: a.name,
                    },
                )
            })
            .collect()
    }
}

fn flight_not_found(flight_id: &FlightId) -> TrackerError {
    TrackerError::not_found(format!("Flight {flight_id} not found"))
}

// ============================================================================
// TESTS
// ============================================================================
