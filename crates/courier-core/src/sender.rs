//! Sender identity — the stable, normalized identifier of a human counterparty.
//!
//! A `Sender` is either a phone number (digits plus a leading `+`) or an email
//! address (lowercased mailbox). Raw strings are never compared directly:
//! `Sender` is a distinct wrapper so that comparing an un-normalized string
//! against one is a compile error, not a subtle runtime bug.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized sender identity.
///
/// Construct via [`Sender::normalize`]; the `Display`/`AsRef<str>` form is
/// always the normalized representation, safe to persist or compare directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sender(String);

impl Sender {
    /// Normalize a raw sender string.
    ///
    /// Phone numbers (contain only digits, spaces, hyphens, parens, and an
    /// optional leading `+`) are reduced to `+` followed by digits only.
    /// Anything containing `@` is treated as an email address and lowercased.
    /// Everything else is trimmed and lowercased as a best-effort fallback.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.contains('@') {
            return Self(trimmed.to_lowercase());
        }
        if looks_like_phone_number(trimmed) {
            let mut digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
            if trimmed.trim_start().starts_with('+') {
                digits.insert(0, '+');
            }
            return Self(digits);
        }
        Self(trimmed.to_lowercase())
    }

    /// Borrow the normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn looks_like_phone_number(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'))
        && s.chars().any(|c| c.is_ascii_digit())
}

impl AsRef<str> for Sender {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_phone_number_variants() {
        let a = Sender::normalize("+1 (555) 123-4567");
        let b = Sender::normalize("15551234567");
        assert_eq!(a.as_str(), "+15551234567");
        assert_eq!(b.as_str(), "15551234567");
    }

    #[test]
    fn normalizes_email_case() {
        let a = Sender::normalize("Alice@Example.COM");
        assert_eq!(a.as_str(), "alice@example.com");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["+1 555 123 4567", "Bob@Example.com", "weird_handle"] {
            let once = Sender::normalize(raw);
            let twice = Sender::normalize(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn distinct_type_prevents_raw_comparison() {
        let a = Sender::normalize("+15551234567");
        let b = Sender::normalize("+15551234567");
        assert_eq!(a, b);
    }
}
