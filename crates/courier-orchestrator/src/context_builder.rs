//! Assembles the prompt text handed to the connector: topic-memory snippet,
//! tools/personality preamble, recent session exchanges, workspace marker,
//! then the user's own body.
//! The connector itself only prepends the stored soul prompt on top of this.

use chrono::{DateTime, Utc};
use courier_config::MemoryConfig;
use courier_core::{util::escape_like_pattern, Channel, Sender};
use courier_storage::{MessageDirection, Store, StoreResult};
use std::path::Path;
use std::sync::Arc;

/// Key under which a per-`(channel, sender)` "context cleared at" marker is
/// stored, consulted so `system: clear context` () excludes
/// everything recorded at or before the reset without touching the
/// `Store` schema.
fn reset_marker_key(channel: Channel, sender: &Sender) -> String {
    format!("context.reset_at.{}.{}", channel.as_str(), sender.as_str())
}

/// Record that `sender`'s context on `channel` was cleared at `now`.
pub fn clear_context(store: &dyn Store, channel: Channel, sender: &Sender, now: DateTime<Utc>) -> StoreResult<()> {
    store.kv_put(&reset_marker_key(channel, sender), &now.to_rfc3339())
}

fn reset_marker(store: &dyn Store, channel: Channel, sender: &Sender) -> StoreResult<Option<DateTime<Utc>>> {
    let Some(raw) = store.kv_get(&reset_marker_key(channel, sender))? else {
        return Ok(None);
    };
    Ok(DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.with_timezone(&Utc)))
}

/// The last `session_window` recorded exchanges for `sender` on `channel`,
/// oldest first, excluding anything at or before a `clear_context` reset.
///
/// `Store::search_messages` is scoped only by sender, so the channel filter
/// and the window truncation both happen client-side here.
pub fn recent_session_messages(
    store: &dyn Store,
    channel: Channel,
    sender: &Sender,
    memory: &MemoryConfig,
) -> StoreResult<Vec<courier_storage::StoredMessage>> {
    let reset_at = reset_marker(store, channel, sender)?;
    let pattern = escape_like_pattern("");
    let mut messages = store.search_messages(sender, &pattern)?;
    messages.retain(|m| m.channel == channel && reset_at.is_none_or(|reset| m.recorded_at > reset));
    // newest-first from the store; keep the most recent `session_window`
    // then restore chronological order for the prompt.
    messages.truncate(memory.session_window);
    messages.reverse();
    Ok(messages)
}

/// Key the Ambient Scanner writes its cross-channel activity summary
/// under. There is no per-sender topic memory: `Store::search_messages`
/// has no cross-sender enumeration, so the ambient digest is necessarily
/// channel-level rather than sender-level (see DESIGN.md).
const AMBIENT_SUMMARY_KV_KEY: &str = "memory.ambient_summary";

/// Record the Ambient Scanner's latest summary.
pub fn store_ambient_summary(store: &dyn Store, summary: &str) -> StoreResult<()> {
    store.kv_put(AMBIENT_SUMMARY_KV_KEY, summary)
}

/// Load the Ambient Scanner's latest summary, if one has been written yet.
pub fn load_ambient_summary(store: &dyn Store) -> StoreResult<Option<String>> {
    store.kv_get(AMBIENT_SUMMARY_KV_KEY)
}

fn format_exchange(message: &courier_storage::StoredMessage) -> String {
    let speaker = match message.direction {
        MessageDirection::Inbound => "user",
        MessageDirection::Outbound => "assistant",
    };
    format!("{speaker}: {}", message.text)
}

/// Build the full prompt body for one turn, given the already-extracted
/// command body, an optional bounded topic-memory snippet, and the
/// workspace this turn runs in.
#[allow(clippy::too_many_arguments)]
pub fn build_prompt(
    store: &Arc<dyn Store>,
    channel: Channel,
    sender: &Sender,
    memory: &MemoryConfig,
    topic_memory: Option<&str>,
    workspace: &Path,
    workspace_alias: &str,
    resume_context: Option<&str>,
    body: &str,
) -> StoreResult<String> {
    let mut sections = Vec::new();

    if let Some(snippet) = topic_memory {
        let bounded: String = snippet.chars().take(memory.max_context_chars).collect();
        if !bounded.is_empty() {
            sections.push(format!("# Notes from memory\n{bounded}"));
        }
    }

    let history = recent_session_messages(store.as_ref(), channel, sender, memory)?;
    if !history.is_empty() {
        let transcript = history.iter().map(format_exchange).collect::<Vec<_>>().join("\n");
        sections.push(format!("# Recent conversation\n{transcript}"));
    }

    sections.push(format!("# Workspace\nYou are operating in workspace \"{workspace_alias}\" at {}.", workspace.display()));

    if let Some(resume) = resume_context {
        sections.push(format!("# Resuming after a checkpoint\n{resume}"));
    }

    sections.push(format!("# Message\n{body}"));

    Ok(sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_marker_key_is_scoped_per_channel_and_sender() {
        let a = reset_marker_key(Channel::Chat, &Sender::normalize("alice"));
        let b = reset_marker_key(Channel::Mail, &Sender::normalize("alice"));
        assert_ne!(a, b);
    }

    #[test]
    fn build_prompt_without_history_or_memory_is_just_workspace_and_body() {
        let store: Arc<dyn Store> = Arc::new(courier_storage::SqliteStore::open_in_memory().unwrap());
        let memory = MemoryConfig {
            max_context_chars: 4000,
            session_window: 10,
        };
        let prompt = build_prompt(
            &store,
            Channel::Chat,
            &Sender::normalize("alice"),
            &memory,
            None,
            Path::new("/tmp/work"),
            "work",
            None,
            "hello",
        )
        .unwrap();
        assert!(prompt.contains("# Workspace"));
        assert!(prompt.contains("# Message\nhello"));
        assert!(!prompt.contains("# Notes from memory"));
    }
}
