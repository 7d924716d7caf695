//! In-process flight reporter
//!
//! Synthesizes position reports for a small roster of flights flying
//! between known airports and feeds them through the same validation and
//! apply path as `POST /flight/update`.

use crate::state::AppState;

use chrono::{DateTime, Utc};
use flight_core::{Airport, airports};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

const CRUISE_ALTITUDE: f64 = 35000.0;

/// (callsign, departure, arrival, aircraft, airline, progress per tick)
const ROSTER: [(&str, &str, &str, &str, &str, f64); 5] = [
    ("AA101", "JFK", "LAX", "Boeing 737", "American Airlines", 0.010),
    ("UA202", "ORD", "SFO", "Airbus A320", "United Airlines", 0.012),
    ("DL303", "ATL", "SEA", "Boeing 757", "Delta Air Lines", 0.009),
    ("BA404", "LHR", "JFK", "Boeing 777", "British Airways", 0.008),
    ("EK505", "DXB", "CDG", "Airbus A380", "Emirates", 0.011),
];

/// One simulated aircraft
#[derive(Debug, Clone)]
struct SimFlight {
    callsign: &'static str,
    leg: u32,
    departure: &'static Airport,
    arrival: &'static Airport,
    aircraft_type: &'static str,
    airline: &'static str,
    progress: f64,
    step: f64,
}

impl SimFlight {
    fn flight_id(&self) -> String {
        format!("{}-{}", self.callsign, self.leg)
    }

    fn phase(&self) -> &'static str {
        match self.progress {
            p if p < 0.05 => "departed",
            p if p < 0.15 => "climbing",
            p if p < 0.85 => "cruising",
            p if p < 1.0 => "descending",
            _ => "landed",
        }
    }

    /// Altitude (ft) and speed (kts) for the current phase
    fn profile(&self) -> (f64, f64) {
        let p = self.progress;
        match self.phase() {
            "departed" => (0.0, 150.0),
            "climbing" => (CRUISE_ALTITUDE * (p - 0.05) / 0.10, 300.0 + p * 200.0),
            "cruising" => (CRUISE_ALTITUDE, 500.0),
            "descending" => (CRUISE_ALTITUDE * (1.0 - p) / 0.15, 400.0),
            _ => (0.0, 0.0),
        }
    }

    fn report(&self, now: DateTime<Utc>) -> Value {
        let position = self
            .departure
            .position
            .interpolate(&self.arrival.position, self.progress);
        let heading = position.bearing_to(&self.arrival.position);
        let (altitude, speed) = self.profile();

        json!({
            "flight_id": self.flight_id(),
            "latitude": position.latitude,
            "longitude": position.longitude,
            "altitude": altitude.round(),
            "speed": speed.round(),
            "heading": heading,
            "status": self.phase(),
            "timestamp": now.to_rfc3339(),
            "aircraft_type": self.aircraft_type,
            "airline": self.airline,
            "departure": self.departure.code,
            "arrival": self.arrival.code,
        })
    }

    fn advance(&mut self) {
        if self.progress >= 1.0 {
            self.leg += 1;
            self.progress = 0.0;
        } else {
            self.progress = (self.progress + self.step).min(1.0);
        }
    }
}

/// Deterministic report generator for the simulated roster
#[derive(Debug, Clone)]
pub struct Simulator {
    flights: Vec<SimFlight>,
}

impl Simulator {
    pub fn new() -> Self {
        let flights = ROSTER
            .iter()
            .filter_map(|&(callsign, from, to, aircraft_type, airline, step)| {
                Some(SimFlight {
                    callsign,
                    leg: 1,
                    departure: airports::lookup(from)?,
                    arrival: airports::lookup(to)?,
                    aircraft_type,
                    airline,
                    progress: 0.0,
                    step,
                })
            })
            .collect();

        Self { flights }
    }

    /// Multiply every flight's per-tick progress
    pub fn with_speedup(mut self, factor: f64) -> Self {
        for flight in &mut self.flights {
            flight.step *= factor;
        }
        self
    }

    pub fn flight_count(&self) -> usize {
        self.flights.len()
    }

    /// Produce one report per flight, then move every flight forward.
    /// A flight that has reported its arrival starts a new leg.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Value> {
        self.flights
            .iter_mut()
            .map(|flight| {
                let report = flight.report(now);
                flight.advance();
                report
            })
            .collect()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed simulated reports into the tracker every `every`
pub async fn run_simulation(state: AppState, every: Duration) {
    let mut simulator = Simulator::new();
    info!("✈️  Simulating {} flights every {:?}", simulator.flight_count(), every);

    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        for report in simulator.tick(Utc::now()) {
            match state.lifecycle.ingest(&report).await {
                Ok(outcome) => debug!(
                    "Simulated {} at {:?}% ({})",
                    outcome.flight_id, outcome.route_progress, outcome.status
                ),
                Err(e) => warn!("Simulated report rejected: {}", e),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use flight_core::{FlightId, validate_report};
    use flight_db::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_reports_are_valid() {
        let mut simulator = Simulator::new().with_speedup(10.0);
        let start = Utc::now();

        for i in 0..15 {
            for report in simulator.tick(start + chrono::Duration::seconds(i)) {
                let parsed = validate_report(&report).unwrap();
                assert!(parsed.details.source_code().is_some());
            }
        }
    }

    #[test]
    fn test_leg_ends_at_arrival() {
        let mut simulator = Simulator::new().with_speedup(100.0);
        let now = Utc::now();

        let first = simulator.tick(now);
        assert_eq!(first[0]["status"], "departed");
        assert_eq!(first[0]["flight_id"], "AA101-1");

        let second = simulator.tick(now);
        assert_eq!(second[0]["status"], "landed");
        assert_eq!(second[0]["altitude"], 0.0);

        let third = simulator.tick(now);
        assert_eq!(third[0]["flight_id"], "AA101-2");
        assert_eq!(third[0]["status"], "departed");
    }

    #[tokio::test]
    async fn test_simulated_flights_land_and_archive() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(ApiConfig::default(), store).unwrap();
        let mut simulator = Simulator::new().with_speedup(200.0);
        let start = Utc::now();

        for i in 0..2 {
            for report in simulator.tick(start + chrono::Duration::minutes(i)) {
                state.lifecycle.ingest(&report).await.unwrap();
            }
        }

        let flight = state
            .queries
            .latest_state(&FlightId::new("AA101-1"))
            .await
            .unwrap();
        assert!(flight.is_landed());

        let archived = state.lifecycle.sweep_landed_flights().await.unwrap();
        assert_eq!(archived, simulator.flight_count());
        assert!(state.queries.active_flights().await.unwrap().is_empty());
    }
}
