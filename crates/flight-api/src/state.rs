//! Application state management

use crate::config::{ApiConfig, StoreBackend};

use flight_db::{DbResult, FlightStore, MemoryStore, ScyllaStore};
use flight_telemetry::MetricsCollector;
use flight_tracker::{EventBus, FlightLifecycleManager, QueryService};
use flight_websocket::WebSocketHub;

use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: ApiConfig,
    /// Flight store, chosen once at startup
    pub store: Arc<dyn FlightStore>,
    /// Write side: apply, archive, sweep
    pub lifecycle: Arc<FlightLifecycleManager>,
    /// Read side
    pub queries: QueryService,
    /// Lifecycle events published by the tracker
    pub events: EventBus,
    /// WebSocket hub for real-time updates
    pub ws_hub: Arc<WebSocketHub>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Create application state, falling back to the in-memory store when
    /// ScyllaDB cannot be reached
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn FlightStore> = match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-memory flight store");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Scylla => match ScyllaStore::connect(config.db.clone()).await {
                Ok(store) => {
                    info!("Database connected");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!("Database connection failed: {}", e);
                    info!("Running in degraded mode (in-memory store)");
                    Arc::new(MemoryStore::new())
                }
            },
        };

        Self::with_store(config, store)
    }

    /// Create application state around an existing store
    pub fn with_store(config: ApiConfig, store: Arc<dyn FlightStore>) -> anyhow::Result<Self> {
        let tracker_config = config.tracker_config();
        let events = EventBus::default();

        let lifecycle = Arc::new(FlightLifecycleManager::new(
            store.clone(),
            tracker_config.clone(),
            events.clone(),
        ));
        let queries = QueryService::new(store.clone(), tracker_config);

        let ws_hub = Arc::new(WebSocketHub::new());
        info!("WebSocket hub initialized");

        let metrics = Arc::new(MetricsCollector::new()?);

        Ok(Self {
            config,
            store,
            lifecycle,
            queries,
            events,
            ws_hub,
            metrics,
        })
    }

    /// Refresh fleet gauges and the hub's welcome count from the store
    pub async fn refresh_fleet_gauges(&self) -> DbResult<()> {
        let active = self.store.count_flights().await?;
        let completed = self.store.count_logs().await?;
        let points = self.store.count_track_points().await?;

        self.metrics.set_fleet(active, completed, points);
        self.metrics.set_ws_connections(self.ws_hub.client_count());
        self.ws_hub.set_active_flights(active);
        Ok(())
    }
}
