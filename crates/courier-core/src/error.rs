//! The thin error umbrella.
//!
//! Each concern owns its own `thiserror` enum (`ConfigError` in `courier-config`,
//! `ApprovalError` in `courier-approval`, and so on). This type exists only
//! for call sites that genuinely span concerns, such as the
//! orchestrator's top-level dispatch result.

use crate::Sender;

/// A short, user-visible classification of why an inbound message was not
/// dispatched by the policy stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The sender is not in the allowlist.
    UnknownSender,
    /// The inbound message was flagged `is_self` and self-suppression is on.
    Echo,
    /// The text was empty after trimming.
    Empty,
    /// Prefix mode is enabled and the text did not start with the configured prefix.
    MissingPrefix,
    /// The channel requires a trigger tag and it was absent.
    MissingTriggerTag,
    /// The sender exceeded the sliding rate-limit window.
    RateLimited,
}

impl DropReason {
    /// The event-log reason string for this drop reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DropReason::UnknownSender => "unknown-sender",
            DropReason::Echo => "echo",
            DropReason::Empty => "empty",
            DropReason::MissingPrefix => "missing-prefix",
            DropReason::MissingTriggerTag => "missing-trigger-tag",
            DropReason::RateLimited => "rate-limited",
        }
    }
}

/// The umbrella error used at cross-concern call sites.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// The message was dropped by policy before reaching the orchestrator.
    #[error("message dropped: {0}")]
    PolicyDropped(&'static str),

    /// An approval-related failure, reported for a specific sender.
    #[error("approval error for {sender}: {reason}")]
    Approval {
        /// The sender who attempted the approval action.
        sender: Sender,
        /// A short, user-visible reason string.
        reason: &'static str,
    },

    /// A generic internal failure that does not fit another variant.
    #[error("internal error: {0}")]
    Internal(String),
}
