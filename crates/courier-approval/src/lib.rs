//! Creates, resolves, and expires sender-bound run approvals.
//!
//! Grounded on the existing `astrid-approval::manager::ApprovalManager` /
//! `ApprovalOutcome`, narrowed to a single approval kind: one pending
//! approval per run, bound to the sender who triggered it, resolved only
//! through an inbound `approve`/`deny` command or TTL expiry. The allowance
//! store, deferred-resolution queue, and session/workspace/always-allow
//! `ApprovalProof` variants do not apply here and are not reproduced (see
//! DESIGN.md).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod request_id;

pub use error::{ApprovalError, ApprovalResult};
pub use request_id::generate as generate_request_id;

use chrono::{DateTime, Duration, Utc};
use courier_core::{ApprovalId, RunId, Sender};
use courier_storage::{Approval, ApprovalOutcome, ApprovalStatus, Run, Store};
use std::sync::Arc;
use tracing::warn;

/// The result of resolving a pending approval.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// The run the approval was bound to, after its state transition.
    pub run: Run,
    /// Whether the sender approved or denied it.
    pub outcome: ApprovalOutcome,
}

/// Creates, resolves, and expires sender-bound run approvals, delegating all
/// persistence to a [`Store`].
pub struct ApprovalManager {
    store: Arc<dyn Store>,
}

impl ApprovalManager {
    /// Build a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a new pending approval for `run_id`, owned by `sender`,
    /// expiring after `ttl`. Returns the short, URL-safe id the sender
    /// replies with (`approve <id>` / `deny <id>`).
    pub fn create(
        &self,
        run_id: RunId,
        sender: &Sender,
        summary: &str,
        command_preview: &str,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> ApprovalResult<ApprovalId> {
        let request_id = request_id::generate();
        self.store.create_approval(
            request_id.clone(),
            run_id,
            sender,
            summary,
            command_preview,
            created_at,
            ttl,
        )?;
        Ok(request_id)
    }

    /// Resolve a pending approval. `decision` of `true` approves, `false`
    /// denies. Enforces the sender-binding invariant: only the sender who
    /// owns the approval may resolve it, and only while it is still pending
    /// and unexpired.
    pub fn resolve(
        &self,
        request_id: &ApprovalId,
        sender: &Sender,
        decision: bool,
        now: DateTime<Utc>,
    ) -> ApprovalResult<ResolveResult> {
        let approval = self.lookup(request_id)?;

        if &approval.sender != sender {
            warn!(%request_id, "approval resolve attempted by a non-owning sender");
            return Err(ApprovalError::WrongSender(request_id.to_string()));
        }
        match approval.status {
            ApprovalStatus::Pending => {}
            ApprovalStatus::Expired => return Err(ApprovalError::Expired(request_id.to_string())),
            ApprovalStatus::Approved | ApprovalStatus::Denied => {
                return Err(ApprovalError::AlreadyResolved(request_id.to_string()))
            }
        }
        if now >= approval.expires_at {
            return Err(ApprovalError::Expired(request_id.to_string()));
        }

        let (run, outcome) = self.store.resolve_approval(request_id, decision)?;
        Ok(ResolveResult { run, outcome })
    }

    /// Transition every approval past its `expires_at` to `EXPIRED`, and its
    /// run accordingly. Intended to be called on a periodic tick by the
    /// daemon's approval-expirer task.
    pub fn expire_due(&self, now: DateTime<Utc>) -> ApprovalResult<Vec<ApprovalId>> {
        let expired = self.store.expire_due_approvals(now)?;
        if !expired.is_empty() {
            warn!(count = expired.len(), "approvals expired without a response");
        }
        Ok(expired)
    }

    /// All approvals currently pending for `sender`, most recently created
    /// first is not guaranteed; callers needing an order should sort by
    /// `created_at`.
    pub fn pending_for_sender(&self, sender: &Sender) -> ApprovalResult<Vec<Approval>> {
        Ok(self.store.pending_approvals_for_sender(sender)?)
    }

    fn lookup(&self, request_id: &ApprovalId) -> ApprovalResult<Approval> {
        self.store
            .get_approval(request_id)
            .map_err(|_| ApprovalError::UnknownId(request_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Channel, RunId};
    use courier_storage::{RunKind, SqliteStore};

    fn manager() -> (ApprovalManager, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        (ApprovalManager::new(store.clone()), store)
    }

    fn seed_run(store: &SqliteStore, sender: &Sender, now: DateTime<Utc>) -> RunId {
        let run_id = RunId::new();
        store
            .create_run(run_id, sender, Channel::Chat, RunKind::Task, "do a thing", "do a thing", now)
            .unwrap();
        run_id
    }

    #[test]
    fn create_then_resolve_by_owning_sender_approves() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        let id = manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(30))
            .unwrap();
        let result = manager.resolve(&id, &sender, true, now).unwrap();
        assert!(matches!(result.outcome, ApprovalOutcome::Approved));
    }

    #[test]
    fn resolve_by_a_different_sender_is_rejected() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let stranger = Sender::normalize("+19998887777");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        let id = manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(30))
            .unwrap();
        let err = manager.resolve(&id, &stranger, true, now).unwrap_err();
        assert!(matches!(err, ApprovalError::WrongSender(_)));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let (manager, _store) = manager();
        let sender = Sender::normalize("+15551234567");
        let bogus = ApprovalId::from_str_lossy("zzzzzzzz");
        let err = manager.resolve(&bogus, &sender, true, Utc::now()).unwrap_err();
        assert!(matches!(err, ApprovalError::UnknownId(_)));
    }

    #[test]
    fn resolving_twice_is_rejected_the_second_time() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        let id = manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(30))
            .unwrap();
        manager.resolve(&id, &sender, true, now).unwrap();
        let err = manager.resolve(&id, &sender, true, now).unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyResolved(_)));
    }

    #[test]
    fn resolving_past_the_ttl_is_rejected_as_expired() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        let id = manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(5))
            .unwrap();
        let later = now + Duration::minutes(10);
        let err = manager.resolve(&id, &sender, true, later).unwrap_err();
        assert!(matches!(err, ApprovalError::Expired(_)));
    }

    #[test]
    fn expire_due_transitions_stale_pending_approvals() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(5))
            .unwrap();
        let later = now + Duration::minutes(10);
        let expired = manager.expire_due(later).unwrap();
        assert_eq!(expired.len(), 1);
    }

    #[test]
    fn pending_for_sender_lists_only_that_senders_approvals() {
        let (manager, store) = manager();
        let sender = Sender::normalize("+15551234567");
        let other = Sender::normalize("+19998887777");
        let now = Utc::now();
        let run_id = seed_run(&store, &sender, now);

        manager
            .create(run_id, &sender, "summary", "preview", now, Duration::minutes(30))
            .unwrap();
        assert_eq!(manager.pending_for_sender(&sender).unwrap().len(), 1);
        assert_eq!(manager.pending_for_sender(&other).unwrap().len(), 0);
    }
}
