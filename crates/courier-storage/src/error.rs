//! Store error taxonomy: logged as an event, the offending operation
//! surfaced to the orchestrator as a generic failure; never crashes the
//! daemon.

use thiserror::Error;

/// Everything that can go wrong talking to the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A schema migration could not be applied.
    #[error("migration failed at version {version}: {source}")]
    Migration {
        /// The migration version that failed.
        version: u32,
        /// The underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// A row referenced by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A JSON payload column failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store's internal connection lock was poisoned by a panicking holder.
    #[error("store connection lock poisoned")]
    LockPoisoned,

    /// A stored identifier column was not a valid UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),
}

/// Result type used throughout this crate.
pub type StoreResult<T> = Result<T, StoreError>;
