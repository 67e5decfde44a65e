//! The reminders reader: lists incomplete items in a
//! designated list. Moving a completed item to the archive list happens
//! after the orchestrator finishes the run, via [`crate::egress::RemindersEgress`]
//! or a direct call to [`PlatformScripting::move_reminder`] — not here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use courier_core::Channel;
use serde_json::json;

use crate::error::{ChannelResult, WithChannel};
use crate::scripting::PlatformScripting;
use crate::types::InboundMessage;
use crate::IngressAdapter;

/// Reads incomplete reminders from a single designated list.
pub struct RemindersReader {
    scripting: Arc<dyn PlatformScripting>,
    list_name: String,
}

impl RemindersReader {
    /// Build a reader over `scripting`, polling `list_name`.
    #[must_use]
    pub fn new(scripting: Arc<dyn PlatformScripting>, list_name: impl Into<String>) -> Self {
        Self {
            scripting,
            list_name: list_name.into(),
        }
    }
}

#[async_trait]
impl IngressAdapter for RemindersReader {
    fn channel(&self) -> Channel {
        Channel::Reminders
    }

    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>> {
        let items = self
            .scripting
            .list_incomplete_reminders(&self.list_name)
            .await
            .with_channel_err(Channel::Reminders)?;

        Ok(items
            .into_iter()
            .map(|item| InboundMessage {
                id: format!("reminders:{}", item.id),
                channel: Channel::Reminders,
                sender: courier_core::Sender::normalize("reminders-app"),
                text: format!("{}\n{}", item.title, item.notes),
                received_at: Utc::now(),
                is_self: false,
                attachments: Vec::new(),
                context_metadata: json!({ "reminder_id": item.id, "title": item.title }),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::ReminderItem;
    use crate::test_support::MockScripting;

    #[tokio::test]
    async fn poll_yields_every_incomplete_reminder() {
        let scripting = Arc::new(MockScripting::default());
        scripting.reminders.lock().unwrap().push(ReminderItem {
            id: "r1".to_string(),
            title: "buy milk".to_string(),
            notes: "2%".to_string(),
        });
        let reader = RemindersReader::new(scripting, "Inbox");
        let messages = reader.poll().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("buy milk"));
    }
}
