//! API request handlers

use crate::error::ApiError;
use crate::state::AppState;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use flight_core::{
    CompletedFlightLog, FlightId, FlightState, TrackPoint, ValidationError, parse_timestamp,
};
use flight_tracker::{AirportInfo, FleetStats, FlightPath, RouteView, TrackerError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub status: &'static str,
    pub message: String,
    pub flight_id: FlightId,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct LocationResponse {
    pub flight_id: FlightId,
    pub requested_time: String,
    pub actual_time: String,
    pub location: LocationSnapshot,
}

#[derive(Serialize)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub status: String,
}

impl From<TrackPoint> for LocationSnapshot {
    fn from(point: TrackPoint) -> Self {
        Self {
            latitude: point.position.latitude,
            longitude: point.position.longitude,
            altitude: point.altitude,
            speed: point.speed,
            heading: point.heading,
            status: point.status,
        }
    }
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub status: &'static str,
    pub message: String,
    pub total_points: usize,
    pub duration_minutes: f64,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub status: &'static str,
    pub message: String,
    pub completed_count: usize,
}

#[derive(Serialize)]
pub struct WebSocketInfoResponse {
    pub url: String,
    pub connected_clients: usize,
    pub events_published: u64,
    pub messages_broadcast: usize,
    pub supported_events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub timestamp: Option<String>,
}

// ============================================================================
// HEALTH & STATUS HANDLERS
// ============================================================================

/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(BannerResponse {
        message: "Flight Tracking Backend Running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check (store reachable)
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.store.health_check().await.unwrap_or(false);

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({ "ready": ready, "store": state.store.backend() })),
    )
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.refresh_fleet_gauges().await {
        warn!("Failed to refresh fleet gauges: {}", e);
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export(),
    )
}

// ============================================================================
// FLIGHT HANDLERS
// ============================================================================

/// Accept a position report
pub async fn update_flight(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<UpdateResponse> {
    let raw: Value = serde_json::from_slice(&body).map_err(|e| {
        state.metrics.record_rejection(None);
        ApiError::bad_request(format!("Request body must be valid JSON: {}", e))
    })?;

    let outcome = match state.lifecycle.ingest(&raw).await {
        Ok(outcome) => outcome,
        Err(TrackerError::Validation(e)) => {
            debug!("Rejected report: {}", e);
            state.metrics.record_rejection(e.field());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(UpdateResponse {
        status: "success",
        message: format!("Data received for flight {}", outcome.flight_id),
        flight_id: outcome.flight_id,
        timestamp: outcome.timestamp.to_rfc3339(),
    }))
}

/// Latest state of a flight
pub async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FlightState> {
    let flight = state.queries.latest_state(&FlightId::new(id)).await?;
    Ok(Json(flight))
}

/// Latest track point at or before `?timestamp=`
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<LocationResponse> {
    let raw = query
        .timestamp
        .filter(|t| !t.trim().is_empty())
        .ok_or(ValidationError::MissingField("timestamp"))?;
    let requested = parse_timestamp(&raw)?;

    let flight_id = FlightId::new(id);
    let point = state.queries.state_at_time(&flight_id, requested).await?;

    Ok(Json(LocationResponse {
        flight_id,
        requested_time: requested.to_rfc3339(),
        actual_time: point.timestamp.to_rfc3339(),
        location: point.into(),
    }))
}

/// Full track history, oldest first
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TrackPoint>> {
    let history = state.queries.history(&FlightId::new(id)).await?;
    Ok(Json(history))
}

/// Archive a flight into the completed logs
pub async fn complete_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CompleteResponse> {
    let receipt = state.lifecycle.archive(&FlightId::new(id)).await?;
    info!("Flight {} completed via API", receipt.flight_id);

    Ok(Json(CompleteResponse {
        status: "success",
        message: format!("Flight {} completed and logged.", receipt.flight_id),
        total_points: receipt.total_points,
        duration_minutes: receipt.duration_minutes,
    }))
}

/// All active flights
pub async fn list_flights(State(state): State<AppState>) -> ApiResult<Vec<FlightState>> {
    Ok(Json(state.queries.active_flights().await?))
}

/// Completed-flight logs, newest first
pub async fn list_logs(State(state): State<AppState>) -> ApiResult<Vec<CompletedFlightLog>> {
    Ok(Json(state.queries.completed_logs().await?))
}

/// Archive every landed flight
pub async fn auto_complete(State(state): State<AppState>) -> ApiResult<SweepResponse> {
    let completed_count = state.lifecycle.sweep_landed_flights().await?;

    Ok(Json(SweepResponse {
        status: "success",
        message: format!("Auto-completed {} landed flights", completed_count),
        completed_count,
    }))
}

/// Fleet statistics
pub async fn flight_stats(State(state): State<AppState>) -> ApiResult<FleetStats> {
    Ok(Json(state.queries.fleet_stats().await?))
}

/// Route view for a flight
pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RouteView> {
    Ok(Json(state.queries.route_view(&FlightId::new(id)).await?))
}

/// Airport table keyed by code
pub async fn list_airports(
    State(state): State<AppState>,
) -> Json<BTreeMap<&'static str, AirportInfo>> {
    Json(state.queries.airports())
}

/// Active flights flying `source` to `destination`
pub async fn flights_by_route(
    State(state): State<AppState>,
    Path((source, destination)): Path<(String, String)>,
) -> ApiResult<Vec<FlightState>> {
    Ok(Json(state.queries.flights_by_route(&source, &destination).await?))
}

/// Track history combined with the planned route
pub async fn get_path(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FlightPath> {
    Ok(Json(state.queries.flight_path(&FlightId::new(id)).await?))
}

// ============================================================================
// WEBSOCKET HANDLERS
// ============================================================================

/// WebSocket connection info
pub async fn websocket_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(WebSocketInfoResponse {
        url: format!("ws://localhost:{}", state.config.ws_port),
        connected_clients: state.ws_hub.client_count(),
        events_published: state.events.get_event_count(),
        messages_broadcast: state.ws_hub.message_count(),
        supported_events: vec![
            "POSITION_UPDATED".into(),
            "FLIGHT_LANDED".into(),
            "FLIGHT_ARCHIVED".into(),
        ],
    })
}
