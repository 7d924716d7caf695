//! Flight lifecycle: apply, archive and sweep

use chrono::{DateTime, Utc};
use flight_core::{
    route_progress_for_codes, validate_report, CompletedFlightLog, Event, FlightId, FlightState,
    PositionReport,
};
use flight_db::FlightStore;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{EventBus, TrackerConfig, TrackerError, TrackerResult};

/// Acknowledgement of an applied report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyOutcome {
    pub flight_id: FlightId,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_progress: Option<f64>,
    pub status: String,
    /// True only for the report that first crossed the landed threshold
    pub newly_landed: bool,
}

/// Result of a successful archival
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveReceipt {
    pub flight_id: FlightId,
    pub total_points: usize,
    pub duration_minutes: f64,
}

/// Applies reports to flight state and moves finished flights into logs
pub struct FlightLifecycleManager {
    store: Arc<dyn FlightStore>,
    config: TrackerConfig,
    events: EventBus,
    /// Held for the whole of an archival or sweep so a flight is logged once
    archive_lock: Mutex<()>,
}

impl FlightLifecycleManager {
    pub fn new(store: Arc<dyn FlightStore>, config: TrackerConfig, events: EventBus) -> Self {
        Self {
            store,
            config,
            events,
            archive_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Validate a raw report and apply it
    pub async fn ingest(&self, raw: &Value) -> TrackerResult<ApplyOutcome> {
        let report = validate_report(raw)?;
        self.apply(report).await
    }

    /// Record a validated report.
    ///
    /// The track point is appended before the state is written; a store
    /// failure on the state write leaves that point in place.
    pub async fn apply(&self, report: PositionReport) -> TrackerResult<ApplyOutcome> {
        self.store.append_track_point(&report).await?;

        let previous = self.store.get_flight(&report.flight_id).await?;
        let was_ready = previous.as_ref().is_some_and(|f| f.ready_for_completion);

        let mut state = match previous {
            Some(mut state) => {
                state.absorb(&report);
                state
            }
            None => FlightState::from_report(&report),
        };

        let codes = (
            report.details.source_code(),
            report.details.destination_code(),
        );
        if let (Some(source), Some(destination)) = codes {
            let progress =
                route_progress_for_codes(&report.position, Some(source), Some(destination));
            state.route_progress = Some(progress);

            if progress >= self.config.landed_threshold {
                state.mark_landed();
            }
        }

        self.store.put_flight(&state).await?;

        let newly_landed = state.ready_for_completion && !was_ready;

        self.events.publish(Event::position_updated(
            state.flight_id.clone(),
            state.position,
            state.status.clone(),
            state.route_progress,
            state.last_updated,
        ));

        if newly_landed {
            info!(
                "🛬 Flight {} landed at {:.2}% route progress",
                state.flight_id,
                state.route_progress.unwrap_or_default()
            );
            self.events
                .publish(Event::flight_landed(state.flight_id.clone(), state.route_progress));
        } else {
            debug!("Applied report for flight {}", state.flight_id);
        }

        Ok(ApplyOutcome {
            flight_id: state.flight_id,
            timestamp: report.timestamp,
            route_progress: state.route_progress,
            status: state.status,
            newly_landed,
        })
    }

    /// Archive a flight on request
    pub async fn archive(&self, flight_id: &FlightId) -> TrackerResult<ArchiveReceipt> {
        let _guard = self.archive_lock.lock().await;
        self.archive_flight(flight_id, false).await
    }

    /// Archive every flight that is landed, flagged, or past the threshold.
    ///
    /// Candidates without track points are left in place. A failure on one
    /// flight is logged and the sweep moves on.
    pub async fn sweep_landed_flights(&self) -> TrackerResult<usize> {
        let _guard = self.archive_lock.lock().await;
        let threshold = self.config.landed_threshold;
        let candidates: Vec<FlightId> = self
            .store
            .list_flights()
            .await?
            .into_iter()
            .filter(|f| f.is_completion_candidate(threshold))
            .map(|f| f.flight_id)
            .collect();

        let mut archived = 0;
        for flight_id in &candidates {
            match self.archive_flight(flight_id, true).await {
                Ok(_) => archived += 1,
                Err(TrackerError::NotFound(_)) => {
                    debug!("Skipping flight {} with no tracking points", flight_id);
                }
                Err(e) => warn!("Auto-completion failed for flight {}: {}", flight_id, e),
            }
        }

        if archived > 0 {
            info!("Auto-completed {} of {} landed flights", archived, candidates.len());
        }
        Ok(archived)
    }

    async fn archive_flight(
        &self,
        flight_id: &FlightId,
        auto: bool,
    ) -> TrackerResult<ArchiveReceipt> {
        let path = self.store.track_points(flight_id).await?;
        if path.is_empty() {
            return Err(TrackerError::not_found(format!(
                "No tracking data found for flight {flight_id}"
            )));
        }

        let state = self.store.get_flight(flight_id).await?;

        let mut log = CompletedFlightLog::new(flight_id.clone(), path, state, Utc::now());
        if auto {
            log = log.with_auto_completion();
        }

        self.store.insert_log(&log).await?;
        // Two independent deletes; a failure between them leaves a partial flight
        self.store.delete_track_points(flight_id).await?;
        self.store.delete_flight(flight_id).await?;

        info!(
            "📦 Archived flight {} ({} points, {} min{})",
            flight_id,
            log.total_tracking_points,
            log.total_duration_minutes,
            if auto { ", auto" } else { "" }
        );

        self.events.publish(Event::flight_archived(
            flight_id.clone(),
            log.total_tracking_points,
            log.total_duration_minutes,
            auto,
        ));

        Ok(ArchiveReceipt {
            flight_id: flight_id.clone(),
            total_points: log.total_tracking_points,
            duration_minutes: log.total_duration_minutes,
        })
    }
}

/// Run the sweep on the configured period; returns `None` when it is zero
pub fn spawn_auto_completion(manager: Arc<FlightLifecycleManager>) -> Option<JoinHandle<()>> {
    let every = manager.config().auto_complete_interval;
    if every.is_zero() {
        info!("Periodic auto-completion disabled");
        return None;
    }

    info!("Periodic auto-completion every {:?}", every);

    Some(tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = manager.sweep_landed_flights().await {
                warn!("Auto-completion sweep failed: {}", e);
            }
        }
    }))
}

// ============================================================================
// TESTS
// ============================================================================
