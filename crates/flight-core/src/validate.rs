//! Inbound position report validation
//!
//! Reporters send loosely typed JSON: numbers may arrive as strings, flight
//! ids as numbers, and timestamps with or without a zone. Everything is
//! normalized here into a [`PositionReport`] before it reaches the tracker.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};
use crate::{Coordinate, FlightDetails, FlightId, PositionReport};

/// Required fields, checked for presence in this order
const REQUIRED_FIELDS: [&str; 8] = [
    "flight_id",
    "latitude",
    "longitude",
    "altitude",
    "speed",
    "heading",
    "status",
    "timestamp",
];

/// Validate a raw report, stamping it with the current server time
pub fn validate_report(raw: &Value) -> ValidationResult<PositionReport> {
    validate_report_at(raw, Utc::now())
}

/// Validate a raw report, stamping it with `received_at`
pub fn validate_report_at(
    raw: &Value,
    received_at: DateTime<Utc>,
) -> ValidationResult<PositionReport> {
    let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| present(object, field).is_none())
    {
        return Err(ValidationError::MissingField(*missing));
    }

    let flight_id = flight_id(object)?;

    // All numeric conversions run before any range check
    let latitude = number(object, "latitude")?;
    let longitude = number(object, "longitude")?;
    let altitude = number(object, "altitude")?;
    let speed = number(object, "speed")?;
    let heading = number(object, "heading")?;

    in_range("latitude", latitude, -90.0, 90.0, "-90 to 90")?;
    in_range("longitude", longitude, -180.0, 180.0, "-180 to 180")?;
    in_range("altitude", altitude, 0.0, f64::MAX, ">= 0")?;
    in_range("speed", speed, 0.0, f64::MAX, ">= 0")?;
    in_range("heading", heading, 0.0, 360.0, "0 to 360")?;

    let status = match present(object, "status") {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(ValidationError::InvalidType("status")),
    };

    let timestamp = match present(object, "timestamp") {
        Some(Value::String(s)) => parse_timestamp(s)?,
        Some(other) => return Err(ValidationError::BadTimestamp(other.to_string())),
        None => return Err(ValidationError::MissingField("timestamp")),
    };

    let details = FlightDetails {
        source: text(object, "source"),
        destination: text(object, "destination"),
        departure: text(object, "departure"),
        arrival: text(object, "arrival"),
        aircraft_type: text(object, "aircraft_type"),
        airline: text(object, "airline"),
        route: present(object, "route").cloned(),
    };

    Ok(PositionReport {
        flight_id,
        position: Coordinate::new(latitude, longitude),
        altitude,
        speed,
        heading,
        status,
        timestamp,
        received_at,
        details,
    })
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> ValidationResult<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Minute precision, with or without an offset
    let zoned = match s.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => s.to_string(),
    };
    if let Ok(dt) = DateTime::parse_from_str(&zoned, "%Y-%m-%dT%H:%M%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = s.parse::<NaiveDateTime>() {
        return Ok(naive.and_utc());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    s.parse::<NaiveDate>()
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::BadTimestamp(input.to_string()))
}

/// A field counts as present when it exists and is not JSON null
fn present<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|v| !v.is_null())
}

fn flight_id(object: &Map<String, Value>) -> ValidationResult<FlightId> {
    match present(object, "flight_id") {
        Some(Value::String(s)) if s.is_empty() => Err(ValidationError::MissingField("flight_id")),
        Some(Value::String(s)) => Ok(FlightId::new(s.as_str())),
        Some(Value::Number(n)) => Ok(FlightId::new(n.to_string())),
        Some(_) => Err(ValidationError::InvalidType("flight_id")),
        None => Err(ValidationError::MissingField("flight_id")),
    }
}

fn number(object: &Map<String, Value>, field: &'static str) -> ValidationResult<f64> {
    let value = match present(object, field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => return Err(ValidationError::MissingField(field)),
    };

    value
        .filter(|v| v.is_finite())
        .ok_or(ValidationError::InvalidType(field))
}

fn in_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> ValidationResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::out_of_range(field, value, expected))
    }
}

/// Optional string field; non-string values are ignored
fn text(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// TESTS
// ============================================================================
