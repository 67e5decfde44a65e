//! Courier Core - shared types for the courier personal daemon.
//!
//! This crate provides the vocabulary every other `courier-*` crate builds on:
//! - [`Sender`], the normalized identity of a human counterparty
//! - [`Channel`], the fixed set of bridged message sources/sinks
//! - identifiers (`RunId`, `ApprovalId`, `SessionId`, `ScheduledActionId`)
//! - the error taxonomy umbrella, [`CourierError`]

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod channel;
pub mod error;
pub mod ids;
pub mod sender;
pub mod util;

pub use channel::Channel;
pub use error::CourierError;
pub use ids::{ApprovalId, RunId, ScheduledActionId, SessionId};
pub use sender::Sender;
