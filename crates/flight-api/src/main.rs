//! # Flight Tracking API Server
//!
//! Main entry point for the flight tracking system.
//! Serves the REST API for position reports and flight queries and
//! coordinates the background services: WebSocket streaming, periodic
//! auto-completion, and the optional flight simulation.

mod config;
mod error;
mod handlers;
mod routes;
mod simulation;
mod state;

use crate::config::ApiConfig;
use crate::routes::create_router;
use crate::state::AppState;

use flight_tracker::spawn_auto_completion;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Period of the simulated reporter
const SIMULATION_TICK: Duration = Duration::from_secs(2);

/// How often fleet gauges are refreshed from the store
const GAUGE_REFRESH: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    info!("✈️  Starting Flight Tracking Server v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Load configuration
    let config = ApiConfig::load()?;
    info!("Configuration loaded");
    info!("   API Port: {}", config.api_port);
    info!("   WebSocket Port: {}", config.ws_port);
    info!("   Store backend: {:?}", config.store_backend);
    info!("   ScyllaDB Hosts: {:?}", config.db.hosts);

    // Initialize application state
    info!("Initializing application state...");
    let state = AppState::new(config.clone()).await?;
    info!("Application state initialized ({} store)", state.store.backend());

    // Create router
    let app = create_router(state.clone());
    info!("Routes configured");

    // Start WebSocket server in background
    let ws_hub = state.ws_hub.clone();
    let ws_port = config.ws_port;
    tokio::spawn(async move {
        info!("Starting WebSocket server on port {}...", ws_port);
        if let Err(e) = flight_websocket::start_server(ws_hub, ws_port).await {
            error!("WebSocket server error: {}", e);
        }
    });

    // Forward lifecycle events to metrics and WebSocket clients
    tokio::spawn(pump_events(state.clone()));

    // Periodic sweep of landed flights
    let _sweeper = spawn_auto_completion(state.lifecycle.clone());

    // Simulated reporter
    if config.simulation_mode {
        let sim_state = state.clone();
        tokio::spawn(async move {
            info!("Starting flight simulation...");
            simulation::run_simulation(sim_state, SIMULATION_TICK).await;
        });
    }

    // Start API server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🚀 API server listening on http://{}", addr);
    info!("WebSocket server on ws://0.0.0.0:{}", config.ws_port);
    info!("Metrics available at http://{}/metrics", addr);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing; `LOG_FORMAT=json` switches to JSON lines
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,flight_api=debug,flight_tracker=debug")
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    }
}

/// Relay tracker events to metrics and the WebSocket hub
async fn pump_events(state: AppState) {
    let mut events = state.events.subscribe();
    let mut refresh = tokio::time::interval(GAUGE_REFRESH);

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    state.metrics.observe_event(&event);
                    state.ws_hub.broadcast(event);
                    state.metrics.record_ws_sent();
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Event pump lagged by {} events", n);
                }
                Err(RecvError::Closed) => {
                    info!("Event bus closed");
                    break;
                }
            },
            _ = refresh.tick() => {
                if let Err(e) = state.refresh_fleet_gauges().await {
                    warn!("Failed to refresh fleet gauges: {}", e);
                }
            }
        }
    }
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
