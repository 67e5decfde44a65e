//! The Daemon: process lifecycle, single-instance lock,
//! channel wiring, task supervision, and the HTTP admin surface.
//!
//! Grounded on the existing `astrid-gateway::server` module: a PID file
//! lock, a `DaemonPaths`-style housekeeping directory, and a `broadcast`-
//! driven cooperative shutdown, carried over to courier's simpler single
//! supervised-task-set model (no plugin registry, no MCP server pool).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod admin;
mod daemon;
mod error;
mod lock;
mod paths;
mod scripting_bridge;
mod wiring;

pub use admin::{serve as serve_admin, AdminState};
pub use daemon::{run, run_admin_only, StartupOptions};
pub use error::{KernelError, KernelResult};
pub use lock::{is_running, read_pid};
pub use paths::DaemonPaths;
pub use scripting_bridge::OsascriptBridge;
