//! # Flight Telemetry - Metrics & Observability
//!
//! Prometheus metrics exporter for the flight tracking system.
//! Provides real-time metrics for:
//! - Report ingestion and validation rejects
//! - Landed and archived flights
//! - Fleet size and tracking volume
//! - WebSocket connections and API requests

use flight_core::{Event, EventPayload};
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use tracing::{info, warn};

/// Metrics collector for the flight tracking system
pub struct MetricsCollector {
    registry: Registry,

    // Ingestion metrics
    reports_ingested: IntCounter,
    reports_rejected: IntCounterVec,

    // Lifecycle metrics
    flights_landed: IntCounter,
    flights_archived: IntCounterVec,

    // Fleet metrics
    active_flights: IntGauge,
    completed_flights: IntGauge,
    tracking_points: IntGauge,

    // WebSocket metrics
    ws_connections: IntGauge,
    ws_messages_sent: IntCounter,

    // API metrics
    api_requests_total: IntCounterVec,
    api_request_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let reports_ingested = IntCounter::new(
            "flight_tracker_reports_ingested_total",
            "Position reports accepted",
        )?;
        registry.register(Box::new(reports_ingested.clone()))?;

        let reports_rejected = IntCounterVec::new(
            Opts::new(
                "flight_tracker_reports_rejected_total",
                "Position reports rejected by validation",
            ),
            &["field"],
        )?;
        registry.register(Box::new(reports_rejected.clone()))?;

        let flights_landed = IntCounter::new(
            "flight_tracker_flights_landed_total",
            "Flights that crossed the landed threshold",
        )?;
        registry.register(Box::new(flights_landed.clone()))?;

        let flights_archived = IntCounterVec::new(
            Opts::new("flight_tracker_flights_archived_total", "Flights moved to completed logs"),
            &["mode"],
        )?;
        registry.register(Box::new(flights_archived.clone()))?;

        let active_flights = IntGauge::new(
            "flight_tracker_active_flights",
            "Flights currently tracked",
        )?;
        registry.register(Box::new(active_flights.clone()))?;

        let completed_flights = IntGauge::new(
            "flight_tracker_completed_flights",
            "Completed-flight logs stored",
        )?;
        registry.register(Box::new(completed_flights.clone()))?;

        let tracking_points = IntGauge::new(
            "flight_tracker_tracking_points",
            "Tracking points held for active flights",
        )?;
        registry.register(Box::new(tracking_points.clone()))?;

        let ws_connections = IntGauge::new(
            "flight_tracker_ws_connections",
            "Active WebSocket connections",
        )?;
        registry.register(Box::new(ws_connections.clone()))?;

        let ws_messages_sent = IntCounter::new(
            "flight_tracker_ws_messages_sent_total",
            "Total WebSocket messages sent",
        )?;
        registry.register(Box::new(ws_messages_sent.clone()))?;

        let api_requests_total = IntCounterVec::new(
            Opts::new("flight_tracker_api_requests_total", "API requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "flight_tracker_api_request_duration_seconds",
                "API request duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        info!("📊 Metrics collector initialized");

        Ok(Self {
            registry,
            reports_ingested,
            reports_rejected,
            flights_landed,
            flights_archived,
            active_flights,
            completed_flights,
            tracking_points,
            ws_connections,
            ws_messages_sent,
            api_requests_total,
            api_request_duration,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
            return String::new();
        }

        String::from_utf8_lossy(&buffer).into_owned()
    }

    // ========================================================================
    // LIFECYCLE METRICS
    // ========================================================================

    /// Count a lifecycle event
    pub fn observe_event(&self, event: &Event) {
        match &event.payload {
            EventPayload::Position(_) => self.reports_ingested.inc(),
            EventPayload::Landed(_) => self.flights_landed.inc(),
            EventPayload::Archived(archived) => {
                let mode = if archived.auto_completed { "auto" } else { "manual" };
                self.flights_archived.with_label_values(&[mode]).inc();
            }
        }
    }

    /// Count a report rejected by validation
    pub fn record_rejection(&self, field: Option<&str>) {
        self.reports_rejected
            .with_label_values(&[field.unwrap_or("body")])
            .inc();
    }

    /// Update fleet size gauges
    pub fn set_fleet(&self, active: usize, completed: usize, tracking_points: usize) {
        self.active_flights.set(active as i64);
        self.completed_flights.set(completed as i64);
        self.tracking_points.set(tracking_points as i64);
    }

    // ========================================================================
    // WEBSOCKET METRICS
    // ========================================================================

    /// Set WebSocket connection count
    pub fn set_ws_connections(&self, count: usize) {
        self.ws_connections.set(count as i64);
    }

    /// Record WebSocket message sent
    pub fn record_ws_sent(&self) {
        self.ws_messages_sent.inc();
    }

    // ========================================================================
    // API METRICS
    // ========================================================================

    /// Record API request
    pub fn record_api_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.api_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.api_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

// ============================================================================
// TESTS
// ============================================================================
