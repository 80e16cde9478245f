//! Error types for tickwatch

use thiserror::Error;

/// Failure to obtain a reading from a [`Clock`](crate::clock::Clock).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Clock unavailable: {0}")]
    Unavailable(String),

    #[error("Clock reading does not fit in 64 bits")]
    Overflow,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Unbalanced finish: timer '{0}' has no open interval")]
    UnbalancedFinish(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
