//! ScyllaDB flight store
//!
//! Records are stored as JSON documents in text columns, keyed the way the
//! queries read them. Timestamps used for ordering live alongside the
//! document as millisecond bigints.

use async_trait::async_trait;
use flight_core::{CompletedFlightLog, FlightId, FlightState, TrackPoint};
use scylla::serialize::row::SerializeRow;
use scylla::{Session, SessionBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::{FlightStore, newest_first};
use crate::{migrations, DbConfig, DbError, DbResult};

/// Flight store backed by a ScyllaDB cluster
#[derive(Clone)]
pub struct ScyllaStore {
    session: Arc<Session>,
}

impl ScyllaStore {
    /// Connect to the cluster and make sure the schema exists
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!("Connecting to ScyllaDB cluster: {:?}", config.hosts);

        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .connection_timeout(config.connection_timeout)
            .build()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        migrations::run_all(&session, &config).await?;
        info!("Connected to ScyllaDB keyspace {}", config.keyspace);

        Ok(Self {
            session: Arc::new(session),
        })
    }

    async fn execute(&self, query: &str, values: impl SerializeRow) -> DbResult<()> {
        self.session
            .query_unpaged(query, values)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Run a query selecting a single `document` column and decode each row
    async fn documents<T: DeserializeOwned>(
        &self,
        query: &str,
        values: impl SerializeRow,
    ) -> DbResult<Vec<T>> {
        let result = self
            .session
            .query_unpaged(query, values)
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows_result = result
            .into_rows_result()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows = rows_result
            .rows::<(String,)>()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut documents = Vec::new();
        for row in rows {
            let (document,) = row.map_err(|e| DbError::Serialization(e.to_string()))?;
            documents.push(serde_json::from_str(&document)?);
        }
        Ok(documents)
    }

    async fn count(&self, query: &str) -> DbResult<usize> {
        let result = self
            .session
            .query_unpaged(query, ())
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows_result = result
            .into_rows_result()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let count = rows_result
            .maybe_first_row::<(i64,)>()
            .map_err(|e| DbError::Query(e.to_string()))?
            .map(|(count,)| count)
            .unwrap_or(0);

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl FlightStore for ScyllaStore {
    fn backend(&self) -> &'static str {
        "scylla"
    }

    async fn get_flight(&self, flight_id: &FlightId) -> DbResult<Option<FlightState>> {
        let query = "SELECT document FROM active_flights WHERE flight_id = ?";
        let mut flights = self.documents(query, (flight_id.as_str(),)).await?;
        Ok(flights.pop())
    }

    async fn put_flight(&self, state: &FlightState) -> DbResult<()> {
        let query = r#"
            INSERT INTO active_flights (flight_id, last_updated_ms, document)
            VALUES (?, ?, ?)
        "#;

        let document = serde_json::to_string(state)?;
        self.execute(
            query,
            (
                state.flight_id.as_str(),
                state.last_updated.timestamp_millis(),
                document,
            ),
        )
        .await
    }

    async fn delete_flight(&self, flight_id: &FlightId) -> DbResult<()> {
        let query = "DELETE FROM active_flights WHERE flight_id = ?";
        self.execute(query, (flight_id.as_str(),)).await
    }

    async fn list_flights(&self) -> DbResult<Vec<FlightState>> {
        self.documents("SELECT document FROM active_flights", ()).await
    }

    async fn count_flights(&self) -> DbResult<usize> {
        self.count("SELECT COUNT(*) FROM active_flights").await
    }

    async fn append_track_point(&self, point: &TrackPoint) -> DbResult<()> {
        let query = r#"
            INSERT INTO flight_tracking (flight_id, timestamp_ms, point_id, document)
            VALUES (?, ?, now(), ?)
        "#;

        let document = serde_json::to_string(point)?;
        self.execute(
            query,
            (
                point.flight_id.as_str(),
                point.timestamp.timestamp_millis(),
                document,
            ),
        )
        .await
    }

    async fn track_points(&self, flight_id: &FlightId) -> DbResult<Vec<TrackPoint>> {
        let query = "SELECT document FROM flight_tracking WHERE flight_id = ?";
        let mut points: Vec<TrackPoint> = self.documents(query, (flight_id.as_str(),)).await?;
        // Clustering is by millisecond; restore sub-millisecond order
        points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(points)
    }

    async fn delete_track_points(&self, flight_id: &FlightId) -> DbResult<()> {
        let query = "DELETE FROM flight_tracking WHERE flight_id = ?";
        self.execute(query, (flight_id.as_str(),)).await
    }

    async fn count_track_points(&self) -> DbResult<usize> {
        self.count("SELECT COUNT(*) FROM flight_tracking").await
    }

    async fn insert_log(&self, log: &CompletedFlightLog) -> DbResult<()> {
        let query = r#"
            INSERT INTO flight_logs (log_id, flight_id, completed_at_ms, document)
            VALUES (?, ?, ?, ?)
        "#;

        let document = serde_json::to_string(log)?;
        self.execute(
            query,
            (
                log.id.to_string(),
                log.flight_id.as_str(),
                log.completed_at.timestamp_millis(),
                document,
            ),
        )
        .await
    }

    async fn list_logs(&self, limit: Option<usize>) -> DbResult<Vec<CompletedFlightLog>> {
        let logs = self.documents("SELECT document FROM flight_logs", ()).await?;
        Ok(newest_first(logs, limit))
    }

    async fn count_logs(&self) -> DbResult<usize> {
        self.count("SELECT COUNT(*) FROM flight_logs").await
    }

    async fn health_check(&self) -> DbResult<bool> {
        let result = self
            .session
            .query_unpaged("SELECT now() FROM system.local", &[])
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Database health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
