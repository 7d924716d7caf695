//! In-memory flight store
//!
//! Backed by concurrent maps; each call takes its locks only for its own
//! duration. Data is lost when the process exits.

use async_trait::async_trait;
use dashmap::DashMap;
use flight_core::{CompletedFlightLog, FlightId, FlightState, TrackPoint};
use parking_lot::RwLock;

use crate::store::{FlightStore, newest_first};
use crate::DbResult;

#[derive(Default)]
pub struct MemoryStore {
    flights: DashMap<FlightId, FlightState>,
    tracks: DashMap<FlightId, Vec<TrackPoint>>,
    logs: RwLock<Vec<CompletedFlightLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlightStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_flight(&self, flight_id: &FlightId) -> DbResult<Option<FlightState>> {
        Ok(self.flights.get(flight_id).map(|f| f.value().clone()))
    }

    async fn put_flight(&self, state: &FlightState) -> DbResult<()> {
        self.flights.insert(state.flight_id.clone(), state.clone());
        Ok(())
    }

    async fn delete_flight(&self, flight_id: &FlightId) -> DbResult<()> {
        self.flights.remove(flight_id);
        Ok(())
    }

    async fn list_flights(&self) -> DbResult<Vec<FlightState>> {
        Ok(self.flights.iter().map(|f| f.value().clone()).collect())
    }

    async fn count_flights(&self) -> DbResult<usize> {
        Ok(self.flights.len())
    }

    async fn append_track_point(&self, point: &TrackPoint) -> DbResult<()> {
        let mut track = self.tracks.entry(point.flight_id.clone()).or_default();
        // After every point with an equal timestamp
        let at = track.partition_point(|p| p.timestamp <= point.timestamp);
        track.insert(at, point.clone());
        Ok(())
    }

    async fn track_points(&self, flight_id: &FlightId) -> DbResult<Vec<TrackPoint>> {
        Ok(self
            .tracks
            .get(flight_id)
            .map(|t| t.value().clone())
            .unwrap_or_default())
    }

    async fn delete_track_points(&self, flight_id: &FlightId) -> DbResult<()> {
        self.tracks.remove(flight_id);
        Ok(())
    }

    async fn count_track_points(&self) -> DbResult<usize> {
        Ok(self.tracks.iter().map(|t| t.len()).sum())
    }

    async fn insert_log(&self, log: &CompletedFlightLog) -> DbResult<()> {
        self.logs.write().push(log.clone());
        Ok(())
    }

    async fn list_logs(&self, limit: Option<usize>) -> DbResult<Vec<CompletedFlightLog>> {
        let logs = self.logs.read().clone();
        Ok(newest_first(logs, limit))
    }

    async fn count_logs(&self) -> DbResult<usize> {
        Ok(self.logs.read().len())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use flight_core::{Coordinate, FlightDetails};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn point(flight: &str, minute: i64, status: &str) -> TrackPoint {
        TrackPoint {
            flight_id: FlightId::new(flight),
            position: Coordinate::new(40.0, -74.0),
            altitude: 1000.0,
            speed: 200.0,
            heading: 90.0,
            status: status.to_string(),
            timestamp: at(minute),
            received_at: Utc::now(),
            details: FlightDetails::default(),
        }
    }

    #[tokio::test]
    async fn test_flight_upsert_and_delete() {
        let store = MemoryStore::new();
        let id = FlightId::new("AA1");

        let mut state = FlightState::from_report(&point("AA1", 0, "boarding"));
        store.put_flight(&state).await.unwrap();

        state.status = "cruising".into();
        store.put_flight(&state).await.unwrap();

        assert_eq!(store.count_flights().await.unwrap(), 1);
        assert_eq!(store.get_flight(&id).await.unwrap().unwrap().status, "cruising");

        store.delete_flight(&id).await.unwrap();
        assert!(store.get_flight(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_track_order_with_ties() {
        let store = MemoryStore::new();
        let id = FlightId::new("AA1");

        store.append_track_point(&point("AA1", 5, "b")).await.unwrap();
        store.append_track_point(&point("AA1", 0, "a")).await.unwrap();
        store.append_track_point(&point("AA1", 5, "c")).await.unwrap();
        store.append_track_point(&point("UA2", 1, "x")).await.unwrap();

        let statuses: Vec<_> = store
            .track_points(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(statuses, vec!["a", "b", "c"]);
        assert_eq!(store.count_track_points().await.unwrap(), 4);

        store.delete_track_points(&id).await.unwrap();
        assert!(store.track_points(&id).await.unwrap().is_empty());
        assert_eq!(store.count_track_points().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_logs_newest_first() {
        let store = MemoryStore::new();

        for (flight, minute) in [("AA1", 10), ("UA2", 30), ("DL3", 20)] {
            let log = CompletedFlightLog::new(FlightId::new(flight), Vec::new(), None, at(minute));
            store.insert_log(&log).await.unwrap();
        }

        let ids: Vec<_> = store
            .list_logs(None)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.flight_id.0)
            .collect();
        assert_eq!(ids, vec!["UA2", "DL3", "AA1"]);

        assert_eq!(store.list_logs(Some(1)).await.unwrap().len(), 1);
        assert_eq!(store.count_logs().await.unwrap(), 3);
    }
}
