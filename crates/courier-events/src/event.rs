//! Event payloads broadcast on the [`crate::EventBus`].
//!
//! These are the live, in-process notifications consumed by the HTTP admin
//! surface (`GET /events` streams the recent ring, future work may stream
//! these live) — distinct from the durable `Event` audit row persisted by
//! `courier-storage`, which the orchestrator writes independently on the
//! same occasions.

use chrono::{DateTime, Utc};
use courier_core::{Channel, RunId, Sender};
use serde::{Deserialize, Serialize};

/// Common fields stamped onto every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The component that produced it, e.g. `"orchestrator"`.
    pub source: String,
}

impl EventMetadata {
    /// Stamp a new metadata block for `source`, timestamped at `now`.
    ///
    /// The caller supplies `now` because this crate never calls
    /// `Utc::now()` directly in library code that might run under test
    /// replay; call sites pass the ambient clock.
    #[must_use]
    pub fn new(source: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            source: source.into(),
        }
    }
}

/// A live notification published by the orchestrator, channel adapters, or
/// the approval manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CourierEvent {
    /// An inbound message was accepted and a run started.
    MessageIngested {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The channel it arrived on.
        channel: Channel,
        /// The normalized sender.
        sender: Sender,
        /// The run created to handle it.
        run_id: RunId,
    },
    /// An inbound message was rejected by policy before reaching the connector.
    MessageIgnored {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The channel it arrived on.
        channel: Channel,
        /// The normalized sender, if one could be determined.
        sender: Option<Sender>,
        /// The drop reason string.
        reason: &'static str,
    },
    /// A connector run changed state.
    RunStateChanged {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The run in question.
        run_id: RunId,
        /// The new state name, e.g. `"COMPLETED"`, `"FAILED"`.
        state: String,
    },
    /// An approval request was created.
    ApprovalCreated {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The short, URL-safe approval id.
        approval_id: String,
        /// The sender who must approve or deny it.
        sender: Sender,
    },
    /// An approval request was resolved, one way or another.
    ApprovalResolved {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The short, URL-safe approval id.
        approval_id: String,
        /// The resolution: `"approved"`, `"denied"`, or `"expired"`.
        resolution: String,
    },
    /// A scheduled follow-up or digest fired.
    ScheduledActionFired {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The scheduled action's id.
        action_id: String,
    },
    /// An outbound message was sent on a channel.
    OutboundSent {
        /// Shared metadata.
        metadata: EventMetadata,
        /// The channel it was sent on.
        channel: Channel,
        /// The normalized recipient.
        recipient: Sender,
    },
}

impl CourierEvent {
    /// A short, stable type tag for logging, matching the `kind` discriminant.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            CourierEvent::MessageIngested { .. } => "message_ingested",
            CourierEvent::MessageIgnored { .. } => "message_ignored",
            CourierEvent::RunStateChanged { .. } => "run_state_changed",
            CourierEvent::ApprovalCreated { .. } => "approval_created",
            CourierEvent::ApprovalResolved { .. } => "approval_resolved",
            CourierEvent::ScheduledActionFired { .. } => "scheduled_action_fired",
            CourierEvent::OutboundSent { .. } => "outbound_sent",
        }
    }
}
