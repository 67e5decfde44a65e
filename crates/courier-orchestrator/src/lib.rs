//! Central inbound router, approval-gated run state machine, and the
//! three proactive loops.
//!
//! Every enabled ingress adapter feeds a single `mpsc::Sender<InboundMessage>`
//! that [`router::run`] drains; every accepted message is dispatched either
//! synchronously (control commands) or as a spawned [`run_turn::execute`]
//! task serialized per `(channel, sender)` by [`ctx::OrchestratorCtx::lock_sender`].
//! The Companion Loop, Follow-Up Scheduler, and Ambient Scanner run as
//! independent supervised tasks alongside the router, sharing the same
//! [`ctx::OrchestratorCtx`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod ambient;
mod companion;
mod context_builder;
mod ctx;
mod egress_registry;
mod error;
mod preview;
mod router;
mod run_turn;
mod scheduler;
mod workspace;

pub use ctx::{OrchestratorCtx, SenderLocks, SharedEgressAdapter};
pub use egress_registry::EgressRegistry;
pub use error::SchedulerError;
pub use router::{handle_inbound, run as run_router};
pub use run_turn::{execute as run_turn, reply as send_reply};

pub use ambient::run as run_ambient_scanner;
pub use companion::run as run_companion_loop;
pub use scheduler::run as run_scheduler;
