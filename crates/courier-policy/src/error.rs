//! There is no `PolicyError`: rejection is a normal, expected outcome
//! represented by [`crate::PolicyVerdict::Drop`], not a `thiserror` variant.
//! This module exists only so the crate structure mirrors its siblings, and
//! to hold the one genuine failure mode: a malformed configuration value.

use thiserror::Error;

/// Configuration the policy engine could not act on.
#[derive(Debug, Error)]
pub enum PolicyConfigError {
    /// The configured chat prefix was empty while `prefix_mode` is enabled.
    #[error("senders.chat_prefix must not be empty when senders.prefix_mode is true")]
    EmptyChatPrefix,
}
