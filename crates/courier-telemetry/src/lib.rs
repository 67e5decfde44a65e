//! Structured logging and request correlation for the courier daemon.
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), courier_telemetry::TelemetryError> {
//! let config = LogConfig::new("info").with_format(LogFormat::Compact);
//! let _guard = setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("orchestrator").with_operation("dispatch");
//! let _entered = ctx.enter();
//! tracing::info!("routing inbound message");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{setup_default_logging, setup_logging, LogConfig, LogFormat, LogTarget};
