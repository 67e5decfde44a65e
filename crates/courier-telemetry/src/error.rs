//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The supplied log-level directive string did not parse.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The global subscriber could not be installed (usually: installed twice).
    #[error("initialization error: {0}")]
    InitError(String),

    /// The log file or directory could not be opened.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
