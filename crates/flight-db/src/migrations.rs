//! Database migrations

use crate::{DbConfig, DbError, DbResult};
use scylla::Session;
use tracing::{debug, info};

/// Tables created on startup, in order
const TABLES: [(&str, &str); 3] = [
    (
        "active_flights",
        r#"
            CREATE TABLE IF NOT EXISTS active_flights (
                flight_id text PRIMARY KEY,
                last_updated_ms bigint,
                document text
            )
        "#,
    ),
    (
        "flight_tracking",
        r#"
            CREATE TABLE IF NOT EXISTS flight_tracking (
                flight_id text,
                timestamp_ms bigint,
                point_id timeuuid,
                document text,
                PRIMARY KEY ((flight_id), timestamp_ms, point_id)
            ) WITH CLUSTERING ORDER BY (timestamp_ms ASC, point_id ASC)
        "#,
    ),
    (
        "flight_logs",
        r#"
            CREATE TABLE IF NOT EXISTS flight_logs (
                log_id text PRIMARY KEY,
                flight_id text,
                completed_at_ms bigint,
                document text
            )
        "#,
    ),
];

/// Create the keyspace and tables, then switch the session to the keyspace
pub async fn run_all(session: &Session, config: &DbConfig) -> DbResult<()> {
    info!("Running database migrations...");

    validate_keyspace(&config.keyspace)?;

    let create_keyspace = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        config.keyspace, config.replication_factor
    );

    session
        .query_unpaged(create_keyspace, &[])
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    session
        .use_keyspace(&config.keyspace, false)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    for (name, ddl) in TABLES {
        session
            .query_unpaged(ddl, &[])
            .await
            .map_err(|e| DbError::Migration(format!("{name}: {e}")))?;
        debug!("Ensured table {}", name);
    }

    info!("Migrations complete");
    Ok(())
}

/// Keyspace names are interpolated into DDL, so only plain identifiers pass
fn validate_keyspace(keyspace: &str) -> DbResult<()> {
    let valid = !keyspace.is_empty()
        && keyspace.len() <= 48
        && keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DbError::Configuration(format!("invalid keyspace name: {keyspace:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_keyspace() {
        assert!(validate_keyspace("flight_tracking").is_ok());
        assert!(validate_keyspace("").is_err());
        assert!(validate_keyspace("flights; DROP TABLE x").is_err());
        assert!(validate_keyspace(&"k".repeat(49)).is_err());
    }

    #[test]
    fn test_table_ddl_matches_names() {
        for (name, ddl) in TABLES {
            assert!(ddl.contains(&format!("CREATE TABLE IF NOT EXISTS {name}")));
        }
    }
}
