//! Error types for habiscope-core

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the habiscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Date range where the end precedes the start
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Correlation requested for a habit against itself
    #[error("cannot correlate habit {0} with itself")]
    IdenticalHabits(String),

    /// Forecast requested over zero days
    #[error("forecast horizon must cover at least one day")]
    EmptyHorizon,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Completion source or snapshot store error
    #[error("source error: {0}")]
    Source(String),
}

/// Result type alias for habiscope-core
pub type Result<T> = std::result::Result<T, Error>;
