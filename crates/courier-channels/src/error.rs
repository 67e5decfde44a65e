//! Typed failures for the ingress/egress boundary.

use courier_core::Channel;
use thiserror::Error;

/// Why an injected [`crate::scripting::PlatformScripting`] call failed. The
/// real AppleScript/EventKit-equivalent calls are out of scope; this is the
/// boundary a mock implementation reports through.
#[derive(Debug, Error)]
pub enum ScriptingError {
    /// The platform call ran but reported failure.
    #[error("platform scripting call failed: {0}")]
    Failed(String),
    /// The platform call did not complete within its configured timeout.
    #[error("platform scripting call timed out")]
    Timeout,
}

/// Why one ingress `poll()` could not be completed.
#[derive(Debug, Error)]
#[error("ingress poll failed on {channel}: {reason}")]
pub struct ChannelError {
    /// The channel the failing reader belongs to.
    pub channel: Channel,
    /// A human-readable reason.
    pub reason: String,
}

impl ChannelError {
    /// Build a `ChannelError` for `channel` with a free-form reason.
    #[must_use]
    pub fn new(channel: Channel, reason: impl Into<String>) -> Self {
        Self {
            channel,
            reason: reason.into(),
        }
    }

    fn from_scripting(channel: Channel, err: ScriptingError) -> Self {
        Self::new(channel, err.to_string())
    }
}

/// Why one egress `send()` could not be completed: `EgressError(channel, reason)`.
#[derive(Debug, Error)]
#[error("egress failed on {channel}: {reason}")]
pub struct EgressError {
    /// The channel the failing writer belongs to.
    pub channel: Channel,
    /// A human-readable reason.
    pub reason: String,
}

impl EgressError {
    /// Build an `EgressError` for `channel` with a free-form reason.
    #[must_use]
    pub fn new(channel: Channel, reason: impl Into<String>) -> Self {
        Self {
            channel,
            reason: reason.into(),
        }
    }

    fn from_scripting(channel: Channel, err: ScriptingError) -> Self {
        Self::new(channel, err.to_string())
    }
}

/// Extension trait letting readers/writers attach their own channel to a
/// `Result<T, ScriptingError>` in one step.
pub(crate) trait WithChannel<T> {
    fn with_channel_err(self, channel: Channel) -> Result<T, ChannelError>;
    fn with_channel_egress_err(self, channel: Channel) -> Result<T, EgressError>;
}

impl<T> WithChannel<T> for Result<T, ScriptingError> {
    fn with_channel_err(self, channel: Channel) -> Result<T, ChannelError> {
        self.map_err(|e| ChannelError::from_scripting(channel, e))
    }

    fn with_channel_egress_err(self, channel: Channel) -> Result<T, EgressError> {
        self.map_err(|e| EgressError::from_scripting(channel, e))
    }
}

/// Result alias for ingress operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
/// Result alias for egress operations.
pub type EgressResult<T> = Result<T, EgressError>;
