//! Row types for every table the store owns.

use chrono::{DateTime, Utc};
use courier_core::{ApprovalId, Channel, RunId, ScheduledActionId, Sender, SessionId};
use serde::{Deserialize, Serialize};

/// An ongoing thread keyed by `(channel, sender)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Surrogate id.
    pub id: SessionId,
    /// The channel this session lives on.
    pub channel: Channel,
    /// The normalized counterparty.
    pub sender: Sender,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last touched by a completed run.
    pub updated_at: DateTime<Utc>,
}

/// Direction of a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Arrived from a channel.
    Inbound,
    /// Sent out on a channel.
    Outbound,
}

impl MessageDirection {
    /// The column string stored in `messages.direction`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }

    /// Parse a column string back into a `MessageDirection`.
    pub fn from_str(s: &str) -> crate::error::StoreResult<Self> {
        match s {
            "inbound" => Ok(MessageDirection::Inbound),
            "outbound" => Ok(MessageDirection::Outbound),
            other => Err(crate::error::StoreError::NotFound(format!(
                "unknown message direction {other:?}"
            ))),
        }
    }
}

/// A single recorded message, inbound or outbound (append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Surrogate id.
    pub id: i64,
    /// The channel it arrived on or was sent to.
    pub channel: Channel,
    /// The normalized counterparty.
    pub sender: Sender,
    /// Inbound or outbound.
    pub direction: MessageDirection,
    /// The idempotency key: the channel's own external message id, if any.
    pub external_id: Option<String>,
    /// The message body.
    pub text: String,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// The run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Just created from an accepted inbound message.
    Received,
    /// A brief plan is being produced for a multi-step command.
    Planning,
    /// Waiting on the originating sender to approve or deny.
    AwaitingApproval,
    /// The connector has been invoked and a child process is running.
    Executing,
    /// A post-condition check is running (Task/Project mutating runs only).
    Verifying,
    /// Timed out with `checkpoint_on_timeout` enabled; eligible for resume.
    Checkpointed,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// The approval was denied.
    Denied,
    /// The approval expired before resolution.
    Expired,
    /// Cancelled via `system: cancel run <id>` or the killswitch.
    Cancelled,
    /// The connector turn completed, but the reply could not be delivered
    /// to the originating sender even after a retry. Distinct from
    /// `Failed`, which means the connector turn itself did not succeed.
    FailedDelivery,
}

impl RunState {
    /// Terminal states never transition further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed
                | RunState::Failed
                | RunState::Denied
                | RunState::Expired
                | RunState::Cancelled
                | RunState::FailedDelivery
        )
    }

    /// The column string stored in `runs.state`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunState::Received => "RECEIVED",
            RunState::Planning => "PLANNING",
            RunState::AwaitingApproval => "AWAITING_APPROVAL",
            RunState::Executing => "EXECUTING",
            RunState::Verifying => "VERIFYING",
            RunState::Checkpointed => "CHECKPOINTED",
            RunState::Completed => "COMPLETED",
            RunState::Failed => "FAILED",
            RunState::Denied => "DENIED",
            RunState::Expired => "EXPIRED",
            RunState::Cancelled => "CANCELLED",
            RunState::FailedDelivery => "FAILED_DELIVERY",
        }
    }

    /// Parse a column string back into a `RunState`.
    pub fn from_str(s: &str) -> crate::error::StoreResult<Self> {
        Ok(match s {
            "RECEIVED" => RunState::Received,
            "PLANNING" => RunState::Planning,
            "AWAITING_APPROVAL" => RunState::AwaitingApproval,
            "EXECUTING" => RunState::Executing,
            "VERIFYING" => RunState::Verifying,
            "CHECKPOINTED" => RunState::Checkpointed,
            "COMPLETED" => RunState::Completed,
            "FAILED" => RunState::Failed,
            "DENIED" => RunState::Denied,
            "EXPIRED" => RunState::Expired,
            "CANCELLED" => RunState::Cancelled,
            "FAILED_DELIVERY" => RunState::FailedDelivery,
            other => {
                return Err(crate::error::StoreError::NotFound(format!(
                    "unknown run state {other:?}"
                )))
            }
        })
    }
}

/// The kind of command a run was created to execute (mirrors
/// `courier_parser::Command` without depending on that crate, since a row
/// must remain deserializable even if the parser's enum grows new variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Free-form chat.
    Chat,
    /// A short idea capture.
    Idea,
    /// A multi-step plan request.
    Plan,
    /// A mutating task.
    Task,
    /// A mutating multi-file project.
    Project,
}

impl RunKind {
    /// Task and Project are the only kinds that ever enter `VERIFYING`.
    #[must_use]
    pub const fn is_verifiable(self) -> bool {
        matches!(self, RunKind::Task | RunKind::Project)
    }

    /// Task, Project, and a `possibly-mutating` Chat are the kinds that
    /// require approval before executing.
    #[must_use]
    pub const fn always_mutates(self) -> bool {
        matches!(self, RunKind::Task | RunKind::Project)
    }

    /// The column string stored in `runs.kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunKind::Chat => "chat",
            RunKind::Idea => "idea",
            RunKind::Plan => "plan",
            RunKind::Task => "task",
            RunKind::Project => "project",
        }
    }

    /// Parse a column string back into a `RunKind`.
    pub fn from_str(s: &str) -> crate::error::StoreResult<Self> {
        Ok(match s {
            "chat" => RunKind::Chat,
            "idea" => RunKind::Idea,
            "plan" => RunKind::Plan,
            "task" => RunKind::Task,
            "project" => RunKind::Project,
            other => {
                return Err(crate::error::StoreError::NotFound(format!(
                    "unknown run kind {other:?}"
                )))
            }
        })
    }
}

/// The lifecycle of a single executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique run id.
    pub run_id: RunId,
    /// The originating sender.
    pub sender: Sender,
    /// The channel the run originated on.
    pub channel: Channel,
    /// The parsed command kind.
    pub kind: RunKind,
    /// Current state.
    pub state: RunState,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// A short, human-readable summary of the prompt, for approval display.
    pub prompt_summary: String,
    /// A preview of the command body shown to the approving sender.
    pub command_preview: String,
    /// The connector's result text, once available.
    pub result: Option<String>,
    /// Number of connector invocations attempted (including resumes).
    pub attempts: u32,
    /// Partial output preserved across a checkpoint, fed back in on resume.
    pub checkpoint_context: Option<String>,
}

/// The outcome of resolving an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting the originating sender's decision.
    Pending,
    /// Approved by the originating sender.
    Approved,
    /// Denied by the originating sender.
    Denied,
    /// Expired before resolution.
    Expired,
}

impl ApprovalStatus {
    /// The column string stored in `approvals.status`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Denied => "denied",
            ApprovalStatus::Expired => "expired",
        }
    }

    /// Parse a column string back into an `ApprovalStatus`.
    pub fn from_str(s: &str) -> crate::error::StoreResult<Self> {
        Ok(match s {
            "pending" => ApprovalStatus::Pending,
            "approved" => ApprovalStatus::Approved,
            "denied" => ApprovalStatus::Denied,
            "expired" => ApprovalStatus::Expired,
            other => {
                return Err(crate::error::StoreError::NotFound(format!(
                    "unknown approval status {other:?}"
                )))
            }
        })
    }
}

/// A request for a sender to approve or deny a mutating run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    /// Short, URL-safe request id.
    pub request_id: ApprovalId,
    /// The run this approval gates.
    pub run_id: RunId,
    /// The only sender allowed to resolve this approval.
    pub sender: Sender,
    /// A short summary of what will happen if approved.
    pub summary: String,
    /// The command preview shown alongside the summary.
    pub command_preview: String,
    /// When the approval was created.
    pub created_at: DateTime<Utc>,
    /// When the approval expires if unresolved.
    pub expires_at: DateTime<Utc>,
    /// Current status.
    pub status: ApprovalStatus,
}

/// The kind of scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledActionKind {
    /// A follow-up nudge after a run completes.
    FollowUp,
    /// A daily/weekly digest write.
    Digest,
    /// A periodic review prompt.
    Review,
}

impl ScheduledActionKind {
    /// The column string stored in `scheduled_actions.kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ScheduledActionKind::FollowUp => "follow-up",
            ScheduledActionKind::Digest => "digest",
            ScheduledActionKind::Review => "review",
        }
    }

    /// Parse a column string back into a `ScheduledActionKind`.
    pub fn from_str(s: &str) -> crate::error::StoreResult<Self> {
        Ok(match s {
            "follow-up" => ScheduledActionKind::FollowUp,
            "digest" => ScheduledActionKind::Digest,
            "review" => ScheduledActionKind::Review,
            other => {
                return Err(crate::error::StoreError::NotFound(format!(
                    "unknown scheduled action kind {other:?}"
                )))
            }
        })
    }
}

/// A time-triggered nudge or digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Unique id.
    pub id: ScheduledActionId,
    /// The run that owns this scheduled action, if any.
    pub run_id: Option<RunId>,
    /// The sender to notify.
    pub sender: Sender,
    /// The channel to notify on.
    pub channel: Channel,
    /// When it becomes due.
    pub fire_at: DateTime<Utc>,
    /// What kind of action this is.
    pub kind: ScheduledActionKind,
    /// How many nudges have already fired for this action.
    pub nudges_sent: u32,
    /// The maximum number of nudges before this action is dropped.
    pub max_nudges: u32,
    /// Opaque payload used to synthesize the follow-up prompt.
    pub payload: String,
}

/// An append-only audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Surrogate id.
    pub id: i64,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// A short, stable kind string, e.g. `"message_ignored"`.
    pub kind: String,
    /// An opaque JSON payload, shape depends on `kind`.
    pub payload: serde_json::Value,
}

/// The outcome of resolving an approval, returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// The approval was approved; the run may proceed to `EXECUTING`.
    Approved,
    /// The approval was denied; the run transitions to `DENIED`.
    Denied,
}
