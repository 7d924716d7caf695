//! API route definitions

use crate::handlers;
use crate::state::AppState;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

const FALLBACK_ORIGIN: &str = "http://localhost:3000";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = if state.config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        let origin = HeaderValue::from_str(&state.config.cors_origin).unwrap_or_else(|_| {
            warn!("Invalid CORS origin {:?}, using {}", state.config.cors_origin, FALLBACK_ORIGIN);
            HeaderValue::from_static(FALLBACK_ORIGIN)
        });
        CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Banner, health & status
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))

        // Metrics (Prometheus format)
        .route("/metrics", get(handlers::metrics))

        // WebSocket info
        .route("/ws/info", get(handlers::websocket_info))

        // Flights API, also served under /api
        .merge(flight_routes())
        .nest("/api", flight_routes())

        // Apply middleware
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

fn flight_routes() -> Router<AppState> {
    Router::new()
        .route("/flight/update", post(handlers::update_flight))
        .route("/flight/{id}", get(handlers::get_flight))
        .route("/flight/{id}/location", get(handlers::get_location))
        .route("/flight/{id}/history", get(handlers::get_history))
        .route("/flight/{id}/complete", post(handlers::complete_flight))
        .route("/flight/{id}/route", get(handlers::get_route))
        .route("/flight/{id}/path", get(handlers::get_path))
        .route("/flights", get(handlers::list_flights))
        .route("/flights/logs", get(handlers::list_logs))
        .route("/flights/auto-complete", post(handlers::auto_complete))
        .route("/flights/stats", get(handlers::flight_stats))
        .route("/flights/route/{source}/{destination}", get(handlers::flights_by_route))
        .route("/airports", get(handlers::list_airports))
}

/// Count and time every routed request, labelled by route template
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    state.metrics.record_api_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, StatusCode, header},
    };
    use flight_core::{Event, FlightId};
    use flight_db::MemoryStore;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::with_store(ApiConfig::default(), Arc::new(MemoryStore::new())).unwrap()
    }

    fn test_app() -> Router {
        create_router(test_state())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        };
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn send_text(app: &Router, uri: &str) -> (StatusCode, String) {
        let request = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn report(lat: f64, lon: f64, timestamp: &str) -> Value {
        json!({
            "flight_id": "AA100",
            "latitude": lat,
            "longitude": lon,
            "altitude": 35000,
            "speed": 480,
            "heading": 270,
            "status": "en-route",
            "timestamp": timestamp,
            "source": "JFK",
            "destination": "LAX",
            "airline": "American Airlines"
        })
    }

    async fn fly_jfk_to_lax(app: &Router) {
        let reports = [
            report(40.6413, -73.7781, "2024-01-01T10:00:00Z"),
            report(37.2915, -96.0933, "2024-01-01T12:00:00Z"),
            report(33.9416, -118.4085, "2024-01-01T14:00:00Z"),
        ];
        for body in reports {
            let (status, response) = send(app, Method::POST, "/flight/update", Some(body)).await;
            assert_eq!(status, StatusCode::OK, "{response}");
            assert_eq!(response["status"], "success");
        }
    }

    #[tokio::test]
    async fn test_banner_and_health() {
        let app = test_app();

        let (status, body) = send(&app, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("Running"));

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn test_end_to_end_landing_and_sweep() {
        let app = test_app();
        fly_jfk_to_lax(&app).await;

        let (status, flight) = send(&app, Method::GET, "/flight/AA100", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(flight["status"], "landed");
        assert_eq!(flight["ready_for_completion"], true);
        assert_eq!(flight["route_progress"], 100.0);

        let (_, matching) = send(&app, Method::GET, "/flights/route/JFK/LAX", None).await;
        assert_eq!(matching.as_array().unwrap().len(), 1);

        let (status, sweep) = send(&app, Method::POST, "/flights/auto-complete", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sweep["completed_count"], 1);

        let (status, logs) = send(&app, Method::GET, "/flights/logs", None).await;
        assert_eq!(status, StatusCode::OK);
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["flight_id"], "AA100");
        assert_eq!(logs[0]["total_tracking_points"], 3);
        assert_eq!(logs[0]["total_duration_minutes"], 240.0);
        assert_eq!(logs[0]["auto_completed"], true);

        let (status, _) = send(&app, Method::GET, "/flight/AA100", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, "/flight/AA100/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, active) = send(&app, Method::GET, "/flights", None).await;
        assert!(active.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_prefix_mirrors_routes() {
        let app = test_app();

        let body = report(40.6413, -73.7781, "2024-01-01T10:00:00Z");
        let (status, _) = send(&app, Method::POST, "/api/flight/update", Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, flight) = send(&app, Method::GET, "/api/flight/AA100", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(flight["source"], "JFK");

        let (status, airports) = send(&app, Method::GET, "/api/airports", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(airports["JFK"]["name"], "John F. Kennedy International");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let app = test_app();

        let mut body = report(95.0, -73.7781, "2024-01-01T10:00:00Z");
        let (status, error) = send(&app, Method::POST, "/flight/update", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "validation_error");
        assert_eq!(error["field"], "latitude");

        body["latitude"] = json!(40.0);
        body.as_object_mut().unwrap().remove("heading");
        let (status, error) = send(&app, Method::POST, "/flight/update", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["field"], "heading");

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/flight/update")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (_, flights) = send(&app, Method::GET, "/flights", None).await;
        assert!(flights.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_location_at_time() {
        let app = test_app();
        fly_jfk_to_lax(&app).await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/flight/AA100/location?timestamp=2024-01-01T13:00:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["actual_time"], "2024-01-01T12:00:00+00:00");
        assert_eq!(body["location"]["latitude"], 37.2915);

        let (status, body) = send(
            &app,
            Method::GET,
            "/flight/AA100/location?timestamp=2024-01-01T13:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requested_time"], "2024-01-01T13:00:00+00:00");

        let (status, _) = send(
            &app,
            Method::GET,
            "/flight/AA100/location?timestamp=2023-12-31T00:00:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, error) = send(&app, Method::GET, "/flight/AA100/location", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["field"], "timestamp");

        let (status, _) = send(
            &app,
            Method::GET,
            "/flight/AA100/location?timestamp=yesterday",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_complete_and_views() {
        let app = test_app();

        let (status, error) = send(&app, Method::POST, "/flight/NOPE/complete", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"], "not_found");

        let body = report(40.6413, -73.7781, "2024-01-01T10:00:00Z");
        send(&app, Method::POST, "/flight/update", Some(body)).await;

        let (status, route) = send(&app, Method::GET, "/flight/AA100/route", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(route["source"]["code"], "JFK");
        assert_eq!(route["waypoints"].as_array().unwrap().len(), 21);

        let (status, path) = send(&app, Method::GET, "/flight/AA100/path", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(path["tracking_points"].as_array().unwrap().len(), 1);

        let (_, stats) = send(&app, Method::GET, "/flights/stats", None).await;
        assert_eq!(stats["active_flights"], 1);
        assert_eq!(stats["total_tracking_points"], 1);

        let (status, done) = send(&app, Method::POST, "/flight/AA100/complete", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["status"], "success");
        assert_eq!(done["total_points"], 1);
        assert_eq!(done["duration_minutes"], 0.0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = test_app();

        let body = report(-91.0, 0.0, "2024-01-01T10:00:00Z");
        send(&app, Method::POST, "/flight/update", Some(body)).await;
        send(&app, Method::GET, "/flights", None).await;

        let (status, text) = send_text(&app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains(r#"flight_tracker_reports_rejected_total{field="latitude"} 1"#));
        assert!(text.contains("flight_tracker_active_flights 0"));
        assert!(text.contains(r#"path="/flights""#));
    }

    #[tokio::test]
    async fn test_websocket_info() {
        let state = test_state();
        let app = create_router(state.clone());

        state
            .ws_hub
            .broadcast(Event::flight_landed(FlightId::new("AA1"), None));

        let (status, body) = send(&app, Method::GET, "/ws/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "ws://localhost:9090");
        assert_eq!(body["connected_clients"], 0);
        assert_eq!(body["messages_broadcast"], 1);
        assert_eq!(body["supported_events"][1], "FLIGHT_LANDED");
    }
}
