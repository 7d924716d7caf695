//! Storage seam for the flight lifecycle

use async_trait::async_trait;
use flight_core::{CompletedFlightLog, FlightId, FlightState, TrackPoint};

use crate::DbResult;

/// Persistence operations needed by the tracker and query layers.
///
/// Calls are independent: nothing here is transactional across methods.
#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    async fn get_flight(&self, flight_id: &FlightId) -> DbResult<Option<FlightState>>;

    /// Insert or replace the state of a flight
    async fn put_flight(&self, state: &FlightState) -> DbResult<()>;

    async fn delete_flight(&self, flight_id: &FlightId) -> DbResult<()>;

    async fn list_flights(&self) -> DbResult<Vec<FlightState>>;

    async fn count_flights(&self) -> DbResult<usize> {
        Ok(self.list_flights().await?.len())
    }

    async fn append_track_point(&self, point: &TrackPoint) -> DbResult<()>;

    /// Track of a flight, ascending by timestamp with ties in insertion order
    async fn track_points(&self, flight_id: &FlightId) -> DbResult<Vec<TrackPoint>>;

    async fn delete_track_points(&self, flight_id: &FlightId) -> DbResult<()>;

    /// Tracking points across all flights
    async fn count_track_points(&self) -> DbResult<usize>;

    async fn insert_log(&self, log: &CompletedFlightLog) -> DbResult<()>;

    /// Completed-flight logs, newest `completed_at` first
    async fn list_logs(&self, limit: Option<usize>) -> DbResult<Vec<CompletedFlightLog>>;

    async fn count_logs(&self) -> DbResult<usize>;

    async fn health_check(&self) -> DbResult<bool> {
        Ok(true)
    }
}

/// Sort logs newest first, keeping later inserts ahead on ties
pub(crate) fn newest_first(
    mut logs: Vec<CompletedFlightLog>,
    limit: Option<usize>,
) -> Vec<CompletedFlightLog> {
    logs.reverse();
    logs.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    if let Some(limit) = limit {
        logs.truncate(limit);
    }
    logs
}
