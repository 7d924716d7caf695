//! Static airport reference table

use serde::Serialize;

use crate::geo::Coordinate;

/// Airport reference entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Airport {
    pub code: &'static str,
    pub name: &'static str,
    #[serde(flatten)]
    pub position: Coordinate,
}

const fn airport(code: &'static str, name: &'static str, lat: f64, lon: f64) -> Airport {
    Airport {
        code,
        name,
        position: Coordinate::new(lat, lon),
    }
}

static AIRPORTS: [Airport; 14] = [
    airport("JFK", "John F. Kennedy International", 40.6413, -73.7781),
    airport("LAX", "Los Angeles International", 33.9416, -118.4085),
    airport("ORD", "Chicago O'Hare International", 41.9786, -87.9048),
    airport("DFW", "Dallas/Fort Worth International", 32.8968, -97.0380),
    airport("ATL", "Hartsfield-Jackson Atlanta International", 33.6407, -84.4277),
    airport("DEN", "Denver International", 39.8561, -104.6737),
    airport("SFO", "San Francisco International", 37.6213, -122.3790),
    airport("SEA", "Seattle-Tacoma International", 47.4502, -122.3088),
    airport("BOS", "Logan International", 42.3656, -71.0096),
    airport("MIA", "Miami International", 25.7959, -80.2871),
    airport("LHR", "London Heathrow", 51.4700, -0.4543),
    airport("CDG", "Charles de Gaulle", 49.0097, 2.5479),
    airport("NRT", "Narita International", 35.7720, 140.3928),
    airport("DXB", "Dubai International", 25.2532, 55.3657),
];

/// All known airports
pub fn all() -> &'static [Airport] {
    &AIRPORTS
}

/// Look up an airport by its code (exact match)
pub fn lookup(code: &str) -> Option<&'static Airport> {
    AIRPORTS.iter().find(|a| a.code == code)
}
