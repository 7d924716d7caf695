//! Error types for report validation

use thiserror::Error;

/// Rejection of an inbound position report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Report must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid data type for field: {0}")]
    InvalidType(&'static str),

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Invalid timestamp format: {0:?}. Use ISO 8601")]
    BadTimestamp(String),
}

impl ValidationError {
    pub fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value,
            expected,
        }
    }

    /// Name of the offending field, if the rejection is tied to one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField(field) | Self::InvalidType(field) => Some(*field),
            Self::OutOfRange { field, .. } => Some(*field),
            Self::BadTimestamp(_) => Some("timestamp"),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;
