//! Encodes a run's workspace alias and reply-thread hint into the single
//! free-form `command_preview` string `courier-storage` persists.
//!
//! A run's workspace alias and its channel-specific thread-of-reply (a
//! reminder id, a note id, a calendar event id) are both needed again once
//! an approval is resolved, possibly much later and after the in-memory
//! dispatch that created the run has long since returned. Rather than widen
//! the `Store` schema for two fields only the orchestrator needs, they ride
//! along in `command_preview` behind a one-line header the approving
//! sender never sees stripped away — the displayed preview is the same text
//! the sender typed, `@alias` included.

const HEADER_PREFIX: &str = "\u{a7}ctx";

/// Prepend an encoded header to `body` when `alias` or `thread_hint` is set.
#[must_use]
pub fn encode(alias: Option<&str>, thread_hint: Option<&str>, body: &str) -> String {
    if alias.is_none() && thread_hint.is_none() {
        return body.to_string();
    }
    let mut header = String::from(HEADER_PREFIX);
    if let Some(alias) = alias {
        header.push_str(" alias=");
        header.push_str(alias);
    }
    if let Some(thread_hint) = thread_hint {
        header.push_str(" thread=");
        header.push_str(thread_hint);
    }
    format!("{header}\n{body}")
}

/// Split a `command_preview` back into `(alias, thread_hint, body)`.
#[must_use]
pub fn decode(command_preview: &str) -> (Option<String>, Option<String>, &str) {
    let Some(rest) = command_preview.strip_prefix(HEADER_PREFIX) else {
        return (None, None, command_preview);
    };
    let Some((header_line, body)) = rest.split_once('\n') else {
        return (None, None, command_preview);
    };
    let mut alias = None;
    let mut thread_hint = None;
    for token in header_line.split_whitespace() {
        if let Some(value) = token.strip_prefix("alias=") {
            alias = Some(value.to_string());
        } else if let Some(value) = token.strip_prefix("thread=") {
            thread_hint = Some(value.to_string());
        }
    }
    (alias, thread_hint, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_body_round_trips_without_a_header() {
        let encoded = encode(None, None, "hello there");
        assert_eq!(encoded, "hello there");
        assert_eq!(decode(&encoded), (None, None, "hello there"));
    }

    #[test]
    fn alias_and_thread_hint_round_trip() {
        let encoded = encode(Some("work"), Some("reminder-42"), "ship the release");
        let (alias, thread, body) = decode(&encoded);
        assert_eq!(alias.as_deref(), Some("work"));
        assert_eq!(thread.as_deref(), Some("reminder-42"));
        assert_eq!(body, "ship the release");
    }

    #[test]
    fn alias_only_round_trips() {
        let encoded = encode(Some("work"), None, "ship it");
        assert_eq!(decode(&encoded), (Some("work".to_string()), None, "ship it"));
    }

    #[test]
    fn body_containing_the_header_marker_is_not_misparsed_when_undecorated() {
        let body = "\u{a7}ctx looks like a header but is not one";
        let (alias, thread, decoded_body) = decode(body);
        // No header was applied by `encode`, so this body has no newline
        // after the marker and decodes as opaque text, unchanged.
        assert_eq!((alias, thread), (None, None));
        assert_eq!(decoded_body, body);
    }
}
