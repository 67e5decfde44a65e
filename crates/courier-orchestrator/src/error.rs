//! Orchestrator-owned error taxonomy.

use thiserror::Error;

/// Everything that can go wrong in the Companion Loop, Follow-Up Scheduler,
/// or Ambient Scanner's periodic work. None of these are fatal to the
/// daemon: a tick that fails is logged and the loop tries again next
/// interval.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The durable store rejected a read or write this tick needed.
    #[error("store error: {0}")]
    Store(#[from] courier_storage::StoreError),

    /// An egress send failed while delivering a proactive or follow-up message.
    #[error("egress error: {0}")]
    Egress(#[from] courier_channels::EgressError),

    /// No egress adapter is registered for the channel a scheduled action
    /// or companion observation needs to notify on.
    #[error("no egress adapter registered for channel {0}")]
    NoEgressAdapter(courier_core::Channel),

    /// The approval manager rejected a lifecycle operation (e.g. expiry).
    #[error("approval error: {0}")]
    Approval(#[from] courier_approval::ApprovalError),
}
