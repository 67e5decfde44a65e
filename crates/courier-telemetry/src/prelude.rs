//! Prelude module - commonly used types for convenient import.
//!
//! `use courier_telemetry::prelude::*;` pulls in everything a typical
//! crate needs without naming each module.

pub use crate::{TelemetryError, TelemetryResult};
pub use crate::{LogConfig, LogFormat, LogTarget};
pub use crate::{setup_default_logging, setup_logging};
pub use crate::{RequestContext, RequestGuard};
