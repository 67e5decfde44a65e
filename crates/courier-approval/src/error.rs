//! Approval resolution failures.

use thiserror::Error;

/// Why `resolve` could not apply a decision to an approval.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// No approval exists with that id.
    #[error("no pending approval with id {0}")]
    UnknownId(String),
    /// The approval exists but belongs to a different sender.
    #[error("approval {0} does not belong to this sender")]
    WrongSender(String),
    /// The approval has already been approved or denied.
    #[error("approval {0} was already resolved")]
    AlreadyResolved(String),
    /// The approval's TTL elapsed before it was resolved.
    #[error("approval {0} expired")]
    Expired(String),
    /// The store failed while reading or writing the approval.
    #[error(transparent)]
    Store(#[from] courier_storage::StoreError),
}

/// Result alias for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
