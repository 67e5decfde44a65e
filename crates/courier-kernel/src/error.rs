//! Kernel-owned error taxonomy: everything that can keep the daemon from
//! starting, or from staying up.

use thiserror::Error;

/// Top-level daemon failure. Only [`KernelError::Config`] and
/// [`KernelError::AlreadyRunning`] are fatal at startup — everything else is
/// logged and the daemon keeps running.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] courier_config::ConfigError),

    /// Logging could not be initialized.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] courier_telemetry::TelemetryError),

    /// The durable store could not be opened.
    #[error("store error: {0}")]
    Store(#[from] courier_storage::StoreError),

    /// Another instance already holds the single-instance lock.
    #[error("another courier daemon is already running (pid {0})")]
    AlreadyRunning(u32),

    /// A filesystem operation the daemon needs at startup failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP admin surface failed to bind or serve.
    #[error("http admin surface error: {0}")]
    Http(String),
}

/// Convenience alias used throughout this crate.
pub type KernelResult<T> = Result<T, KernelError>;
