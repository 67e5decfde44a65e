//! The fixed set of bridged message sources and sinks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five platform channels, or the synthetic HTTP task channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// The local chat database (e.g. an iMessage-style store).
    Chat,
    /// The mail client, driven via platform scripting.
    Mail,
    /// The reminders app.
    Reminders,
    /// The notes app.
    Notes,
    /// The calendar app.
    Calendar,
    /// The synthetic channel backing the HTTP task endpoint.
    Http,
}

impl Channel {
    /// All channels, in a stable order used for supervised-task enumeration.
    #[must_use]
    pub const fn all() -> [Channel; 6] {
        [
            Channel::Chat,
            Channel::Mail,
            Channel::Reminders,
            Channel::Notes,
            Channel::Calendar,
            Channel::Http,
        ]
    }

    /// Whether this channel requires the configured trigger tag to be present
    /// on inbound items: every non-chat, non-HTTP channel does; Chat and HTTP
    /// never do.
    #[must_use]
    pub const fn requires_trigger_tag(self) -> bool {
        matches!(
            self,
            Channel::Mail | Channel::Reminders | Channel::Notes | Channel::Calendar
        )
    }

    /// The machine-readable name used in config keys, store rows, and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Chat => "chat",
            Channel::Mail => "mail",
            Channel::Reminders => "reminders",
            Channel::Notes => "notes",
            Channel::Calendar => "calendar",
            Channel::Http => "http",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognized channel name.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized channel name: {0}")]
pub struct ParseChannelError(pub String);

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(Channel::Chat),
            "mail" => Ok(Channel::Mail),
            "reminders" => Ok(Channel::Reminders),
            "notes" => Ok(Channel::Notes),
            "calendar" => Ok(Channel::Calendar),
            "http" => Ok(Channel::Http),
            other => Err(ParseChannelError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        for c in Channel::all() {
            assert_eq!(c.as_str().parse::<Channel>().unwrap(), c);
        }
    }

    #[test]
    fn trigger_tag_requirement_matches_spec() {
        assert!(!Channel::Chat.requires_trigger_tag());
        assert!(!Channel::Http.requires_trigger_tag());
        assert!(Channel::Mail.requires_trigger_tag());
        assert!(Channel::Reminders.requires_trigger_tag());
        assert!(Channel::Notes.requires_trigger_tag());
        assert!(Channel::Calendar.requires_trigger_tag());
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!("carrier-pigeon".parse::<Channel>().is_err());
    }
}
