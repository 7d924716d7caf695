//! # Flight DB - Flight State Persistence
//!
//! Provides the persistence layer for active flight state, tracking points
//! and completed-flight logs. Two backends implement [`FlightStore`]: an
//! in-memory store for development and tests, and a ScyllaDB store that
//! keeps each record as a JSON document.

pub mod error;
pub mod memory;
pub mod migrations;
pub mod scylla_store;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use scylla_store::ScyllaStore;
pub use store::FlightStore;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    #[serde(skip, default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_replication_factor() -> u32 {
    1
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: "flight_tracking".to_string(),
            connection_timeout: default_connection_timeout(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl DbConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let hosts = std::env::var("SCYLLA_HOSTS")
            .map(|hosts| parse_hosts(&hosts))
            .unwrap_or(defaults.hosts);

        let keyspace = std::env::var("SCYLLA_KEYSPACE").unwrap_or(defaults.keyspace);

        let replication_factor = std::env::var("SCYLLA_REPLICATION_FACTOR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.replication_factor);

        Self {
            hosts,
            keyspace,
            replication_factor,
            ..Default::default()
        }
    }
}

/// Split a comma separated host list, dropping empty entries
fn parse_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default() {
        let config = DbConfig::default();
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.keyspace, "flight_tracking");
        assert_eq!(config.replication_factor, 1);
    }

    #[test]
    fn test_parse_hosts() {
        let hosts = parse_hosts("scylla-node1:9042, scylla-node2:9042,,");
        assert_eq!(hosts, vec!["scylla-node1:9042", "scylla-node2:9042"]);
    }
}
