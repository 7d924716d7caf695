//! Geographic types and calculations for flight positioning

use serde::{Deserialize, Serialize};

use crate::airports;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of route segments used for waypoint views
pub const DEFAULT_WAYPOINT_SEGMENTS: usize = 20;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Calculate distance to another coordinate using the Haversine formula.
    /// Returns distance in kilometers.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lng = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        // a can round above 1.0 near antipodes
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }

    /// Initial bearing to another coordinate in degrees (0-360)
    pub fn bearing_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lng = (other.longitude - self.longitude).to_radians();

        let y = delta_lng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

        let bearing = y.atan2(x).to_degrees();
        (bearing + 360.0) % 360.0
    }

    /// Coordinate reached by travelling `distance_km` along the great circle
    /// leaving this point at `bearing_deg`
    pub fn destination(&self, distance_km: f64, bearing_deg: f64) -> Coordinate {
        let lat1 = self.latitude.to_radians();
        let lng1 = self.longitude.to_radians();
        let bearing = bearing_deg.to_radians();
        let angular_distance = distance_km / EARTH_RADIUS_KM;

        let lat2 = (lat1.sin() * angular_distance.cos()
            + lat1.cos() * angular_distance.sin() * bearing.cos())
        .asin();

        let lng2 = lng1
            + (bearing.sin() * angular_distance.sin() * lat1.cos())
                .atan2(angular_distance.cos() - lat1.sin() * lat2.sin());

        Coordinate::new(lat2.to_degrees(), lng2.to_degrees())
    }

    /// Linear interpolation in lat/lon space.
    /// fraction: 0.0 = self, 1.0 = other (both exact)
    pub fn interpolate(&self, other: &Coordinate, fraction: f64) -> Coordinate {
        let t = fraction.clamp(0.0, 1.0);

        Coordinate::new(
            self.latitude * (1.0 - t) + other.latitude * t,
            self.longitude * (1.0 - t) + other.longitude * t,
        )
    }

    pub fn to_lat_lon(&self) -> LatLon {
        LatLon {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/// Compact `{lat, lon}` pair used by route views
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Interpolated point on the straight lat/lon line between two airports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteWaypoint {
    pub lat: f64,
    pub lon: f64,
    /// Nominal progress of this point along the route (0-100)
    pub progress: f64,
}

/// Great-circle distance in kilometers
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    a.distance_to(b)
}

/// Percentage of the source -> destination great-circle distance already
/// covered, measured by the remaining distance to the destination.
///
/// Clamped to [0, 100] and rounded to two decimals. A degenerate route
/// (source == destination) is always complete.
pub fn route_progress(current: &Coordinate, source: &Coordinate, destination: &Coordinate) -> f64 {
    let total = source.distance_to(destination);
    if total == 0.0 {
        return 100.0;
    }

    let remaining = current.distance_to(destination);
    let progress = ((total - remaining) / total * 100.0).clamp(0.0, 100.0);
    round2(progress)
}

/// Route progress between two airport codes.
///
/// Returns 0 when either code is missing or not in the airport table, so
/// callers cannot tell "no route" from "just departed" by this value alone.
pub fn route_progress_for_codes(
    current: &Coordinate,
    source: Option<&str>,
    destination: Option<&str>,
) -> f64 {
    let endpoints = source
        .and_then(airports::lookup)
        .zip(destination.and_then(airports::lookup));

    match endpoints {
        Some((src, dst)) => route_progress(current, &src.position, &dst.position),
        None => 0.0,
    }
}

/// Evenly spaced waypoints from `source` to `destination`, `segments + 1`
/// points inclusive of both endpoints.
pub fn waypoints(
    source: &Coordinate,
    destination: &Coordinate,
    segments: usize,
) -> Vec<RouteWaypoint> {
    if segments == 0 {
        return vec![RouteWaypoint {
            lat: source.latitude,
            lon: source.longitude,
            progress: 0.0,
        }];
    }

    (0..=segments)
        .map(|i| {
            let fraction = i as f64 / segments as f64;
            let point = source.interpolate(destination, fraction);
            RouteWaypoint {
                lat: point.latitude,
                lon: point.longitude,
                progress: fraction * 100.0,
            }
        })
        .collect()
}

/// Waypoints between two airport codes; empty when either code is unknown
pub fn waypoints_for_codes(source: &str, destination: &str, segments: usize) -> Vec<RouteWaypoint> {
    match (airports::lookup(source), airports::lookup(destination)) {
        (Some(src), Some(dst)) => waypoints(&src.position, &dst.position, segments),
        _ => Vec::new(),
    }
}

/// Total distance flown along an ordered sequence of coordinates, rounded
/// to two decimals
pub fn path_distance<'a, I>(points: I) -> f64
where
    I: IntoIterator<Item = &'a Coordinate>,
{
    let mut points = points.into_iter();
    let Some(mut previous) = points.next() else {
        return 0.0;
    };

    let mut total = 0.0;
    for point in points {
        total += previous.distance_to(point);
        previous = point;
    }

    round2(total)
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
