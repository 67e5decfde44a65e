//! The mail reader: lists unread messages via
//! [`PlatformScripting`] and marks each as read once ingested.

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Channel, Sender};
use serde_json::json;

use crate::error::{ChannelResult, WithChannel};
use crate::scripting::PlatformScripting;
use crate::types::InboundMessage;
use crate::IngressAdapter;

/// Reads unread mail no older than a configured age, marking each message as
/// read after it has been successfully turned into an [`InboundMessage`].
pub struct MailReader {
    scripting: Arc<dyn PlatformScripting>,
    max_age_minutes: u32,
}

impl MailReader {
    /// Build a reader over `scripting`, only considering mail newer than
    /// `max_age_minutes`.
    #[must_use]
    pub fn new(scripting: Arc<dyn PlatformScripting>, max_age_minutes: u32) -> Self {
        Self {
            scripting,
            max_age_minutes,
        }
    }
}

#[async_trait]
impl IngressAdapter for MailReader {
    fn channel(&self) -> Channel {
        Channel::Mail
    }

    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>> {
        let messages = self
            .scripting
            .list_unread_mail(self.max_age_minutes)
            .await
            .with_channel_err(Channel::Mail)?;

        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            self.scripting
                .mark_mail_read(&message.id)
                .await
                .with_channel_err(Channel::Mail)?;

            out.push(InboundMessage {
                id: format!("mail:{}", message.id),
                channel: Channel::Mail,
                sender: Sender::normalize(&message.from),
                text: format!("{}\n\n{}", message.subject, message.body),
                received_at: message.received_at,
                is_self: false,
                attachments: Vec::new(),
                context_metadata: json!({ "subject": message.subject, "message_id": message.id }),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::MailMessage;
    use crate::test_support::MockScripting;
    use chrono::Utc;

    #[tokio::test]
    async fn poll_marks_each_message_read() {
        let scripting = Arc::new(MockScripting::default());
        scripting.unread_mail.lock().unwrap().push(MailMessage {
            id: "m1".to_string(),
            from: "Someone@Example.com".to_string(),
            subject: "hi".to_string(),
            body: "please help".to_string(),
            received_at: Utc::now(),
        });
        let reader = MailReader::new(scripting.clone(), 1440);
        let messages = reader.poll().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender.as_str(), "someone@example.com");
        assert_eq!(scripting.marked_read.lock().unwrap().as_slice(), ["m1"]);
    }

    #[tokio::test]
    async fn listing_failure_is_reported_as_a_channel_error() {
        let scripting = Arc::new(MockScripting::default());
        *scripting.fail_next.lock().unwrap() = Some(crate::ScriptingError::Timeout);
        let reader = MailReader::new(scripting, 1440);
        let err = reader.poll().await.unwrap_err();
        assert_eq!(err.channel, Channel::Mail);
    }
}
