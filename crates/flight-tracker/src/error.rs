//! Tracker error types

use flight_core::ValidationError;
use flight_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

impl TrackerError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
