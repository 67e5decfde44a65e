//! Typed connector failures.
//!
//! Every non-success branch carries whatever partial stdout was captured
//! before the failure, so the orchestrator can checkpoint a timed-out or
//! cancelled run instead of discarding its progress.

use thiserror::Error;

/// Why one connector turn did not produce a usable result.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The configured executable could not be found on `PATH`.
    #[error("connector command not found: {0}")]
    CommandNotFound(String),
    /// The process failed to spawn for a reason other than "not found".
    #[error("failed to spawn connector process: {0}")]
    SpawnFailed(String),
    /// The child exited with a non-zero status.
    #[error("connector exited with status {code:?}: {stderr}")]
    NonZeroExit {
        /// The process exit code, if the OS reported one.
        code: Option<i32>,
        /// Captured stderr.
        stderr: String,
        /// Whatever stdout was captured before exit.
        partial_output: String,
    },
    /// The turn exceeded its configured timeout; the child was killed.
    #[error("connector turn timed out")]
    Timeout {
        /// Whatever stdout was captured before the kill.
        partial_output: String,
    },
    /// The turn was cancelled via `cancel(run_id)` or the daemon killswitch.
    #[error("connector turn cancelled")]
    Cancelled {
        /// Whatever stdout was captured before the kill.
        partial_output: String,
    },
    /// The child exited zero but produced no usable text.
    #[error("connector produced empty output")]
    EmptyOutput,
    /// Writing the prompt to the child's stdin, or reading its stdout/stderr,
    /// failed at the OS level.
    #[error("connector I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// The partial output captured before this failure, if any is available
    /// for checkpointing ("Checkpoint and resume").
    #[must_use]
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { partial_output, .. }
            | Self::Timeout { partial_output }
            | Self::Cancelled { partial_output } => Some(partial_output),
            Self::CommandNotFound(_) | Self::SpawnFailed(_) | Self::EmptyOutput | Self::Io(_) => {
                None
            }
        }
    }
}

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
