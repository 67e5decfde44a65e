//! The `Store` trait: the public contract every persistence backend must
//! satisfy. `SqliteStore` is the sole implementation.

use crate::error::StoreResult;
use crate::models::{
    Approval, ApprovalOutcome, Run, RunState, ScheduledAction, ScheduledActionKind, Session,
    StoredEvent, StoredMessage,
};
use chrono::{DateTime, Utc};
use courier_core::{ApprovalId, Channel, RunId, ScheduledActionId, Sender};

/// A single field update applied to a run; `update_run_state` only ever
/// touches the state plus whichever of these are supplied.
#[derive(Debug, Clone, Default)]
pub struct RunStateUpdate {
    /// Replace `result`, if set.
    pub result: Option<String>,
    /// Replace `checkpoint_context`, if set.
    pub checkpoint_context: Option<String>,
    /// Increment `attempts` by this amount.
    pub attempts_delta: u32,
}

/// Exclusive owner of all durable state: sessions, runs, approvals, events,
/// scheduled actions, and small key-value entries.
pub trait Store: Send + Sync {
    /// Fetch the `(channel, sender)` session, creating it if it does not exist.
    fn create_session(&self, channel: Channel, sender: &Sender) -> StoreResult<Session>;

    /// Every known session, most recently updated first, capped at `limit`.
    fn list_sessions(&self, limit: usize) -> StoreResult<Vec<Session>>;

    /// Append a recorded message. Returns `Ok(None)` without inserting if
    /// `external_id` is `Some` and already recorded for this channel
    /// (the dedupe key from `InboundMessage.id`).
    #[allow(clippy::too_many_arguments)]
    fn record_message(
        &self,
        channel: Channel,
        sender: &Sender,
        direction: crate::models::MessageDirection,
        external_id: Option<&str>,
        text: &str,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<Option<StoredMessage>>;

    /// Create a new run in `RunState::Received`.
    #[allow(clippy::too_many_arguments)]
    fn create_run(
        &self,
        run_id: RunId,
        sender: &Sender,
        channel: Channel,
        kind: crate::models::RunKind,
        prompt_summary: &str,
        command_preview: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Transition a run to `new_state`, applying `update` at the same time.
    fn update_run_state(
        &self,
        run_id: RunId,
        new_state: RunState,
        update: RunStateUpdate,
    ) -> StoreResult<()>;

    /// Fetch a run by id.
    fn get_run(&self, run_id: RunId) -> StoreResult<Run>;

    /// Create a pending approval for `run_id`, expiring after `ttl`. The
    /// caller (`courier-approval`) mints `request_id`; the store only
    /// persists it — id generation is not a storage concern.
    #[allow(clippy::too_many_arguments)]
    fn create_approval(
        &self,
        request_id: ApprovalId,
        run_id: RunId,
        sender: &Sender,
        summary: &str,
        command_preview: &str,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> StoreResult<()>;

    /// Resolve a pending approval. `decision` of `true` approves, `false` denies.
    /// Only the originating sender may resolve it (enforced by the caller via
    /// `courier-approval`; the store itself just performs the transition once
    /// authorized).
    fn resolve_approval(
        &self,
        request_id: &ApprovalId,
        decision: bool,
    ) -> StoreResult<(Run, ApprovalOutcome)>;

    /// Fetch an approval by id.
    fn get_approval(&self, request_id: &ApprovalId) -> StoreResult<Approval>;

    /// All pending approvals owned by `sender`.
    fn pending_approvals_for_sender(&self, sender: &Sender) -> StoreResult<Vec<Approval>>;

    /// Every pending approval regardless of sender, oldest first, capped at `limit`.
    fn list_pending_approvals(&self, limit: usize) -> StoreResult<Vec<Approval>>;

    /// Transition every pending approval past `expires_at` to `Expired`,
    /// returning the affected ids.
    fn expire_due_approvals(&self, now: DateTime<Utc>) -> StoreResult<Vec<ApprovalId>>;

    /// Append an audit event.
    fn append_event(&self, kind: &str, payload: serde_json::Value, now: DateTime<Utc>) -> StoreResult<()>;

    /// The most recent `limit` audit events, newest first.
    fn recent_events(&self, limit: usize) -> StoreResult<Vec<StoredEvent>>;

    /// Schedule a follow-up, digest, or review action.
    #[allow(clippy::too_many_arguments)]
    fn schedule_action(
        &self,
        id: ScheduledActionId,
        run_id: Option<RunId>,
        sender: &Sender,
        channel: Channel,
        fire_at: DateTime<Utc>,
        kind: ScheduledActionKind,
        max_nudges: u32,
        payload: &str,
    ) -> StoreResult<()>;

    /// Scheduled actions due at or before `now`, oldest first, capped at `limit`.
    fn due_actions(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ScheduledAction>>;

    /// Record that a scheduled action fired. Increments `nudges_sent`; the
    /// caller (the Follow-Up Scheduler) is responsible for dropping the
    /// action once the nudge budget is exhausted.
    fn mark_action_fired(&self, id: &ScheduledActionId, success: bool) -> StoreResult<()>;

    /// Remove a scheduled action entirely (nudge budget exhausted).
    fn remove_action(&self, id: &ScheduledActionId) -> StoreResult<()>;

    /// Push a still-active action's `fire_at` forward to fire again later.
    fn reschedule_action(&self, id: &ScheduledActionId, fire_at: DateTime<Utc>) -> StoreResult<()>;

    /// Read a key-value entry.
    fn kv_get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a key-value entry, overwriting any existing value.
    fn kv_put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Search a sender's message history by a `LIKE` pattern (caller must
    /// have already escaped wildcard metacharacters via
    /// `courier_core::util::escape_like_pattern`).
    fn search_messages(&self, sender: &Sender, escaped_pattern: &str) -> StoreResult<Vec<StoredMessage>>;
}
