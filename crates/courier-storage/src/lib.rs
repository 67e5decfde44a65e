//! SQLite-backed durable store: sessions, runs, approvals, events, and
//! scheduled actions.
//!
//! [`Store`] is the public contract; [`SqliteStore`] is the sole
//! implementation, one write connection behind a mutex plus a read
//! connection per calling thread, both against the same WAL-mode file.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod migrations;
mod models;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use models::{
    Approval, ApprovalOutcome, ApprovalStatus, MessageDirection, Run, RunKind, RunState,
    ScheduledAction, ScheduledActionKind, Session, StoredEvent, StoredMessage,
};
pub use sqlite::SqliteStore;
pub use store::{RunStateUpdate, Store};
