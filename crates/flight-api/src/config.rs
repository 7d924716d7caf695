//! API server configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File, Source};
use flight_db::DbConfig;
use flight_tracker::TrackerConfig;
use serde::Deserialize;

/// Which store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Scylla,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST API port
    pub api_port: u16,
    /// WebSocket port
    pub ws_port: u16,
    /// Enable CORS for all origins (development)
    pub cors_permissive: bool,
    /// Allowed origin when CORS is restricted
    pub cors_origin: String,
    /// Run the in-process flight reporter
    pub simulation_mode: bool,
    /// Seconds between background sweeps (0 disables)
    pub auto_complete_interval_secs: u64,
    pub store_backend: StoreBackend,
    /// Database configuration
    #[serde(skip, default = "DbConfig::from_env")]
    pub db: DbConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: 5000,
            ws_port: 9090,
            cors_permissive: true,
            cors_origin: "http://localhost:3000".to_string(),
            simulation_mode: false,
            auto_complete_interval_secs: 30,
            store_backend: StoreBackend::Memory,
            db: DbConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load `.env`, an optional `flight-tracker` config file and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(Environment::default().try_parsing(true))
    }

    /// Layer `overrides` over the defaults and the optional config file
    pub fn from_source<S>(overrides: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("api_port", 5000)?
            .set_default("ws_port", 9090)?
            .set_default("cors_permissive", true)?
            .set_default("cors_origin", "http://localhost:3000")?
            .set_default("simulation_mode", false)?
            .set_default("auto_complete_interval_secs", 30)?
            .set_default("store_backend", "memory")?
            .add_source(File::with_name("flight-tracker").required(false))
            .add_source(overrides)
            .build()?
            .try_deserialize()
    }

    /// Lifecycle settings derived from this configuration
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            auto_complete_interval: Duration::from_secs(self.auto_complete_interval_secs),
            ..TrackerConfig::default()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map)).try_parsing(true)
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_source(env(&[])).unwrap();

        assert_eq!(config.api_port, 5000);
        assert_eq!(config.ws_port, 9090);
        assert!(config.cors_permissive);
        assert!(!config.simulation_mode);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(
            config.tracker_config().auto_complete_interval,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_environment_overrides() {
        let config = ApiConfig::from_source(env(&[
            ("API_PORT", "8080"),
            ("SIMULATION_MODE", "true"),
            ("STORE_BACKEND", "scylla"),
            ("AUTO_COMPLETE_INTERVAL_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 8080);
        assert!(config.simulation_mode);
        assert_eq!(config.store_backend, StoreBackend::Scylla);
        assert!(config.tracker_config().auto_complete_interval.is_zero());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(ApiConfig::from_source(env(&[("STORE_BACKEND", "mongo")])).is_err());
    }
}
