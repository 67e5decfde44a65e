//! Sender allowlist, echo suppression, trigger-tag stripping, and sliding
//! rate-limit window for inbound messages.
//!
//! Grounded on the existing `astrid-approval::policy::SecurityPolicy::check`:
//! an ordered list of ownership/sanity rules, each returning a tagged
//! result rather than a boolean, so every rejection carries its own reason.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod rate_limiter;

pub use error::PolicyConfigError;
pub use rate_limiter::RateLimiter;

use courier_core::{Channel, DropReason, Sender};
use courier_config::SendersConfig;

/// The input to a policy decision: everything known about one inbound item
/// before any command parsing has happened.
#[derive(Debug, Clone)]
pub struct PolicyInput<'a> {
    /// The channel the message arrived on.
    pub channel: Channel,
    /// The raw sender identifier as reported by the channel (not yet
    /// necessarily normalized by the caller — normalization happens here).
    pub raw_sender: &'a str,
    /// Whether the channel flagged this message as sent by the daemon itself.
    pub is_self: bool,
    /// The message text, including any title (for Mail/Notes/Calendar,
    /// callers should concatenate title and body before calling).
    pub text: &'a str,
}

/// The outcome of running policy over one [`PolicyInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyVerdict {
    /// The message is accepted; dispatch `effective_text` (trigger tag
    /// stripped, if the channel required one).
    Accept {
        /// The normalized sender.
        sender: Sender,
        /// The text to hand to the command parser.
        effective_text: String,
    },
    /// The message is rejected; record a `message_ignored` event with `reason`.
    Drop {
        /// The normalized sender, if one could be determined at all.
        sender: Option<Sender>,
        /// Why it was dropped.
        reason: DropReason,
    },
}

/// Evaluates [`PolicyInput`]s against a [`SendersConfig`] and a sliding
/// rate-limit window, in a fixed rule order.
pub struct Policy {
    config: SendersConfig,
    trigger_tag: String,
    rate_limiter: RateLimiter,
}

impl Policy {
    /// Build a policy engine from the allowlist/prefix/trigger-tag config
    /// plus the rate-limit window parameters.
    #[must_use]
    pub fn new(config: SendersConfig, trigger_tag: String, window: std::time::Duration, max_messages: u32) -> Self {
        Self {
            config,
            trigger_tag,
            rate_limiter: RateLimiter::new(window, max_messages),
        }
    }

    /// Evaluate one inbound item. `now` is supplied by the caller so the
    /// rate limiter is deterministic under test.
    pub fn evaluate(&self, input: &PolicyInput<'_>, now: std::time::Instant) -> PolicyVerdict {
        let sender = Sender::normalize(input.raw_sender);

        // Rule 1: unknown sender.
        if !self.config.allowed.iter().any(|allowed| Sender::normalize(allowed) == sender) {
            return PolicyVerdict::Drop {
                sender: Some(sender),
                reason: DropReason::UnknownSender,
            };
        }

        // Rule 2: self-echo.
        if input.is_self && self.config.suppress_self {
            return PolicyVerdict::Drop {
                sender: Some(sender),
                reason: DropReason::Echo,
            };
        }

        // Rule 3: empty after trimming.
        let trimmed = input.text.trim();
        if trimmed.is_empty() {
            return PolicyVerdict::Drop {
                sender: Some(sender),
                reason: DropReason::Empty,
            };
        }

        // Rule 4: prefix mode.
        if self.config.prefix_mode {
            let prefix = self.config.chat_prefix.to_lowercase();
            if !trimmed.to_lowercase().starts_with(&prefix) {
                return PolicyVerdict::Drop {
                    sender: Some(sender),
                    reason: DropReason::MissingPrefix,
                };
            }
        }

        // Rule 5: trigger tag required on non-Chat, non-HTTP channels.
        let effective_text = if input.channel.requires_trigger_tag() {
            match strip_trigger_tag(trimmed, &self.trigger_tag) {
                Some(stripped) => stripped,
                None => {
                    return PolicyVerdict::Drop {
                        sender: Some(sender),
                        reason: DropReason::MissingTriggerTag,
                    }
                }
            }
        } else {
            trimmed.to_string()
        };

        // Rule 6: sliding-window rate limit.
        if self.rate_limiter.record_and_check(&sender, now) {
            return PolicyVerdict::Drop {
                sender: Some(sender),
                reason: DropReason::RateLimited,
            };
        }

        PolicyVerdict::Accept {
            sender,
            effective_text,
        }
    }
}

/// Remove the trigger tag (case-insensitive) from `text`, returning `None`
/// if it is not present anywhere in the text.
fn strip_trigger_tag(text: &str, tag: &str) -> Option<String> {
    let lower_text = text.to_lowercase();
    let lower_tag = tag.to_lowercase();
    let pos = lower_text.find(&lower_tag)?;
    let mut stripped = String::with_capacity(text.len() - tag.len());
    stripped.push_str(&text[..pos]);
    stripped.push_str(&text[pos + tag.len()..]);
    Some(stripped.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn policy() -> Policy {
        let config = SendersConfig {
            allowed: vec!["+15551234567".to_string()],
            suppress_self: true,
            prefix_mode: false,
            chat_prefix: "!".to_string(),
        };
        Policy::new(config, "!!agent".to_string(), Duration::from_secs(60), 10)
    }

    #[test]
    fn unknown_sender_is_dropped() {
        let policy = policy();
        let input = PolicyInput {
            channel: Channel::Chat,
            raw_sender: "+19998887777",
            is_self: false,
            text: "hello",
        };
        let verdict = policy.evaluate(&input, Instant::now());
        assert_eq!(
            verdict,
            PolicyVerdict::Drop {
                sender: Some(Sender::normalize("+19998887777")),
                reason: DropReason::UnknownSender,
            }
        );
    }

    #[test]
    fn self_echo_is_dropped_before_empty_check() {
        let policy = policy();
        let input = PolicyInput {
            channel: Channel::Chat,
            raw_sender: "+15551234567",
            is_self: true,
            text: "",
        };
        let verdict = policy.evaluate(&input, Instant::now());
        assert!(matches!(
            verdict,
            PolicyVerdict::Drop {
                reason: DropReason::Echo,
                ..
            }
        ));
    }

    #[test]
    fn chat_channel_never_requires_trigger_tag() {
        let policy = policy();
        let input = PolicyInput {
            channel: Channel::Chat,
            raw_sender: "+15551234567",
            is_self: false,
            text: "hello there",
        };
        let verdict = policy.evaluate(&input, Instant::now());
        assert_eq!(
            verdict,
            PolicyVerdict::Accept {
                sender: Sender::normalize("+15551234567"),
                effective_text: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn mail_channel_requires_trigger_tag_and_strips_it() {
        let policy = policy();
        let input = PolicyInput {
            channel: Channel::Mail,
            raw_sender: "+15551234567",
            is_self: false,
            text: "please !!agent summarize this thread",
        };
        let verdict = policy.evaluate(&input, Instant::now());
        assert_eq!(
            verdict,
            PolicyVerdict::Accept {
                sender: Sender::normalize("+15551234567"),
                effective_text: "please  summarize this thread".to_string(),
            }
        );
    }

    #[test]
    fn mail_channel_without_trigger_tag_is_dropped() {
        let policy = policy();
        let input = PolicyInput {
            channel: Channel::Mail,
            raw_sender: "+15551234567",
            is_self: false,
            text: "just a regular email",
        };
        let verdict = policy.evaluate(&input, Instant::now());
        assert!(matches!(
            verdict,
            PolicyVerdict::Drop {
                reason: DropReason::MissingTriggerTag,
                ..
            }
        ));
    }

    #[test]
    fn rate_limit_trips_on_the_k_plus_first_message() {
        let config = SendersConfig {
            allowed: vec!["+15551234567".to_string()],
            suppress_self: true,
            prefix_mode: false,
            chat_prefix: "!".to_string(),
        };
        let policy = Policy::new(config, "!!agent".to_string(), Duration::from_secs(60), 2);
        let now = Instant::now();
        let input = PolicyInput {
            channel: Channel::Chat,
            raw_sender: "+15551234567",
            is_self: false,
            text: "hello",
        };
        assert!(matches!(policy.evaluate(&input, now), PolicyVerdict::Accept { .. }));
        assert!(matches!(policy.evaluate(&input, now), PolicyVerdict::Accept { .. }));
        assert!(matches!(
            policy.evaluate(&input, now),
            PolicyVerdict::Drop {
                reason: DropReason::RateLimited,
                ..
            }
        ));
    }
}
