//! The notes reader: lists notes in a designated folder
//! bearing the configured trigger tag.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Channel, Sender};
use serde_json::json;
use tokio::time::timeout as tokio_timeout;

use crate::error::{ChannelError, ChannelResult};
use crate::scripting::PlatformScripting;
use crate::types::InboundMessage;
use crate::IngressAdapter;

/// Reads notes from a designated folder, retrying a bounded number of times
/// on timeout before surfacing a [`ChannelError`].
pub struct NotesReader {
    scripting: Arc<dyn PlatformScripting>,
    folder: String,
    trigger_tag: String,
    call_timeout: Duration,
    max_retries: u32,
}

impl NotesReader {
    /// Build a reader over `scripting`, polling `folder` for notes bearing
    /// `trigger_tag`, allowing `max_retries` retries on a fetch timeout.
    #[must_use]
    pub fn new(
        scripting: Arc<dyn PlatformScripting>,
        folder: impl Into<String>,
        trigger_tag: impl Into<String>,
        call_timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            scripting,
            folder: folder.into(),
            trigger_tag: trigger_tag.into(),
            call_timeout,
            max_retries,
        }
    }

    async fn list_with_retry(&self) -> ChannelResult<Vec<crate::scripting::NoteItem>> {
        let mut attempts = 0;
        loop {
            let call = self.scripting.list_notes(&self.folder, &self.trigger_tag);
            match tokio_timeout(self.call_timeout, call).await {
                Ok(Ok(items)) => return Ok(items),
                Ok(Err(e)) => return Err(ChannelError::new(Channel::Notes, e.to_string())),
                Err(_elapsed) if attempts < self.max_retries => {
                    attempts += 1;
                    continue;
                }
                Err(_elapsed) => {
                    return Err(ChannelError::new(Channel::Notes, "fetch timed out"));
                }
            }
        }
    }
}

#[async_trait]
impl IngressAdapter for NotesReader {
    fn channel(&self) -> Channel {
        Channel::Notes
    }

    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>> {
        let items = self.list_with_retry().await?;

        Ok(items
            .into_iter()
            .map(|item| InboundMessage {
                id: format!("notes:{}", item.id),
                channel: Channel::Notes,
                sender: Sender::normalize("notes-app"),
                text: format!("{}\n{}", item.title, item.body),
                received_at: item.modified_at,
                is_self: false,
                attachments: Vec::new(),
                context_metadata: json!({ "note_id": item.id, "title": item.title }),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::NoteItem;
    use crate::test_support::MockScripting;
    use chrono::Utc;

    #[tokio::test]
    async fn poll_yields_every_tagged_note() {
        let scripting = Arc::new(MockScripting::default());
        scripting.notes.lock().unwrap().push(NoteItem {
            id: "n1".to_string(),
            title: "idea".to_string(),
            body: "!!agent do the thing".to_string(),
            modified_at: Utc::now(),
        });
        let reader = NotesReader::new(scripting, "Agent", "!!agent", Duration::from_secs(5), 2);
        let messages = reader.poll().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("do the thing"));
    }

    #[tokio::test]
    async fn scripting_failure_surfaces_as_channel_error() {
        let scripting = Arc::new(MockScripting::default());
        *scripting.fail_next.lock().unwrap() = Some(crate::ScriptingError::Failed("boom".to_string()));
        let reader = NotesReader::new(scripting, "Agent", "!!agent", Duration::from_secs(5), 2);
        let err = reader.poll().await.unwrap_err();
        assert_eq!(err.channel, Channel::Notes);
    }
}
