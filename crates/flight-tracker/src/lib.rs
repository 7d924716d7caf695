//! # Flight Tracker - Lifecycle Orchestration
//!
//! Owns the flight state machine: applying validated reports, deriving
//! route progress and landed signals, and archiving finished flights into
//! completed-flight logs. The read side lives in [`QueryService`].
//!
//! ## Features
//! - Report ingestion with sticky landed detection
//! - Explicit and sweep-based archival with per-flight failure isolation
//! - Periodic background auto-completion
//! - Route, path and fleet statistics views

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod query;

pub use error::{TrackerError, TrackerResult};
pub use events::EventBus;
pub use lifecycle::{spawn_auto_completion, ApplyOutcome, ArchiveReceipt, FlightLifecycleManager};
pub use query::{AirportInfo, AirportView, FleetStats, FlightPath, QueryService, RouteView};

use flight_core::DEFAULT_WAYPOINT_SEGMENTS;
use std::time::Duration;

/// Tracking system configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Route progress (percent) at which a flight is forced to landed
    pub landed_threshold: f64,
    /// Segments used when rendering route waypoints
    pub waypoint_segments: usize,
    /// Entries in the "recent" lists of fleet statistics
    pub recent_limit: usize,
    /// Period of the background sweep; zero disables it
    pub auto_complete_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            landed_threshold: 95.0,
            waypoint_segments: DEFAULT_WAYPOINT_SEGMENTS,
            recent_limit: 5,
            auto_complete_interval: Duration::from_secs(30),
        }
    }
}
