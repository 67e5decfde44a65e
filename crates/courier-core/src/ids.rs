//! Identifier newtypes for the store's owned entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = uuid::Error;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

uuid_id!(RunId, "Identifier for a [`Run`](crate) lifecycle row.");
uuid_id!(SessionId, "Identifier for a `(channel, sender)` session.");
uuid_id!(ScheduledActionId, "Identifier for a scheduled follow-up/digest/review action.");

/// Identifier for a pending or resolved approval.
///
/// Unlike the other identifiers this is not a UUID: it needs to be a
/// short, URL-safe, typeable-from-a-phone-keyboard token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ApprovalId {
    /// Wrap an existing string as an approval id (used when parsing `approve <id>`).
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        Self(s.to_string())
    }
}
