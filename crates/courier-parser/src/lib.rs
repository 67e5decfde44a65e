//! Classifies the policy-accepted effective text into a [`Command`].
//!
//! Grounded on `astrid-core::input::InputClassification`'s "classify, don't
//! duck-type" idiom and `astrid-approval::policy`'s explicit tagged-result
//! style: parsing never returns a bare string, always a closed enum the
//! orchestrator dispatches exhaustively.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use regex::Regex;
use std::sync::OnceLock;

/// What `deny <id>` or `deny all` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyTarget {
    /// Deny a single approval by id.
    Id(String),
    /// Deny every pending approval owned by the sender.
    All,
}

/// The classified command kind, with any kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free-form chat, or `relay:` (treated as a chat synonym; see below).
    Chat {
        /// Set when the text matches a mutation-heuristic imperative verb
        /// pattern; the orchestrator treats such runs as mutating and
        /// demands approval ("Ambiguity").
        possibly_mutating: bool,
    },
    /// A short idea capture (`idea:`).
    Idea,
    /// A multi-step plan request (`plan:`).
    Plan,
    /// A mutating task (`task:`). Always requires approval.
    Task,
    /// A mutating multi-file project (`project:`). Always requires approval.
    Project,
    /// `approve <id> [extra]`.
    Approve {
        /// The approval id to resolve.
        id: String,
        /// Any trailing text after the id, included as extra context.
        extra: Option<String>,
    },
    /// `deny <id>` or `deny all`.
    Deny(DenyTarget),
    /// `status`.
    Status,
    /// `health`.
    Health,
    /// `history:` or the bare keyword, with an optional search query.
    History {
        /// The search query, if one was given.
        query: Option<String>,
    },
    /// `usage:`.
    Usage,
    /// `logs:`.
    Logs,
    /// `system:<subcommand>`.
    System {
        /// The subcommand text following `system:`.
        subcommand: String,
    },
    /// `clear context` / `new chat`.
    ClearContext,
    /// `help`.
    Help,
}

/// The full result of classifying one piece of effective text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The classified command.
    pub command: Command,
    /// A `@alias` extracted from the first whitespace-delimited token of
    /// the body, if present.
    pub workspace_alias: Option<String>,
    /// The remaining text after the prefix and alias have been stripped.
    pub body: String,
}

fn mutation_heuristic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(create|write|modify|delete|install|deploy|rename|refactor)\b")
            .expect("mutation heuristic pattern is a valid regex")
    })
}

/// Classify `text` (already policy-accepted, trigger-tag stripped) into a
/// [`ParsedCommand`].
#[must_use]
pub fn classify(text: &str) -> ParsedCommand {
    let trimmed = text.trim();

    if let Some((prefix, rest)) = split_prefix(trimmed) {
        let (alias, body) = extract_alias(rest);
        let command = match prefix.as_str() {
            "idea" => Command::Idea,
            "plan" => Command::Plan,
            "task" => Command::Task,
            "project" => Command::Project,
            "relay" => Command::Chat {
                possibly_mutating: mutation_heuristic().is_match(&body),
            },
            "system" => Command::System {
                subcommand: body.clone(),
            },
            "history" => Command::History {
                query: non_empty(&body),
            },
            "usage" => Command::Usage,
            "health" => Command::Health,
            "logs" => Command::Logs,
            _ => unreachable!("split_prefix only returns known prefixes"),
        };
        return ParsedCommand {
            command,
            workspace_alias: alias,
            body,
        };
    }

    let lower = trimmed.to_lowercase();
    let (alias, body) = extract_alias(trimmed);

    let command = if let Some(rest) = lower.strip_prefix("approve ") {
        let rest_original = &trimmed[trimmed.len() - rest.len()..];
        let mut parts = rest_original.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or(rest_original).to_string();
        let extra = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Command::Approve { id, extra }
    } else if lower == "deny all" {
        Command::Deny(DenyTarget::All)
    } else if let Some(rest) = lower.strip_prefix("deny ") {
        let rest_original = &trimmed[trimmed.len() - rest.len()..];
        Command::Deny(DenyTarget::Id(rest_original.trim().to_string()))
    } else if lower == "status" {
        Command::Status
    } else if lower == "help" {
        Command::Help
    } else if lower == "clear context" || lower == "new chat" {
        Command::ClearContext
    } else {
        Command::Chat {
            possibly_mutating: mutation_heuristic().is_match(trimmed),
        }
    };

    ParsedCommand {
        command,
        workspace_alias: alias,
        body,
    }
}

const PREFIXES: &[&str] = &[
    "idea", "plan", "task", "project", "relay", "system", "history", "usage", "health", "logs",
];

/// Split a leading `<kind>:` token off `text`, if `<kind>` is a known prefix.
fn split_prefix(text: &str) -> Option<(String, String)> {
    let (head, rest) = text.split_once(':')?;
    let head_lower = head.trim().to_lowercase();
    if PREFIXES.contains(&head_lower.as_str()) {
        Some((head_lower, rest.trim_start().to_string()))
    } else {
        None
    }
}

/// Pull a leading `@alias` token off `text`'s first whitespace-delimited word.
fn extract_alias(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('@') {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let alias = parts.next().unwrap_or("").to_string();
        let remainder = parts.next().unwrap_or("").trim_start().to_string();
        if !alias.is_empty() {
            return (Some(alias), remainder);
        }
    }
    (None, text.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chat_has_no_prefix() {
        let parsed = classify("hello there");
        assert_eq!(
            parsed.command,
            Command::Chat {
                possibly_mutating: false
            }
        );
    }

    #[test]
    fn relay_prefix_is_a_chat_synonym() {
        let parsed = classify("relay: tell them I'm running late");
        assert_eq!(
            parsed.command,
            Command::Chat {
                possibly_mutating: false
            }
        );
        assert_eq!(parsed.body, "tell them I'm running late");
    }

    #[test]
    fn task_prefix_is_case_insensitive_with_trailing_whitespace() {
        let parsed = classify("TASK:   refactor the auth module  ");
        assert_eq!(parsed.command, Command::Task);
        assert_eq!(parsed.body, "refactor the auth module");
    }

    #[test]
    fn chat_with_mutation_verb_is_flagged_possibly_mutating() {
        let parsed = classify("please delete the old backup folder");
        assert_eq!(
            parsed.command,
            Command::Chat {
                possibly_mutating: true
            }
        );
    }

    #[test]
    fn alias_is_extracted_from_body() {
        let parsed = classify("task: @work ship the release notes");
        assert_eq!(parsed.command, Command::Task);
        assert_eq!(parsed.workspace_alias.as_deref(), Some("work"));
        assert_eq!(parsed.body, "ship the release notes");
    }

    #[test]
    fn approve_with_id_and_extra() {
        let parsed = classify("approve ab12cd go ahead");
        assert_eq!(
            parsed.command,
            Command::Approve {
                id: "ab12cd".to_string(),
                extra: Some("go ahead".to_string()),
            }
        );
    }

    #[test]
    fn deny_all_is_distinct_from_deny_id() {
        assert_eq!(classify("deny all").command, Command::Deny(DenyTarget::All));
        assert_eq!(
            classify("deny ab12cd").command,
            Command::Deny(DenyTarget::Id("ab12cd".to_string()))
        );
    }

    #[test]
    fn control_keywords_are_recognized_exactly() {
        assert_eq!(classify("status").command, Command::Status);
        assert_eq!(classify("help").command, Command::Help);
        assert_eq!(classify("clear context").command, Command::ClearContext);
        assert_eq!(classify("new chat").command, Command::ClearContext);
    }

    #[test]
    fn history_prefix_carries_optional_query() {
        let parsed = classify("history: dinner plans");
        assert_eq!(
            parsed.command,
            Command::History {
                query: Some("dinner plans".to_string())
            }
        );
        let parsed = classify("history:");
        assert_eq!(parsed.command, Command::History { query: None });
    }
}
