//! The HTTP task endpoint: the one push-based ingress.
//! Unlike the five pull-based readers, this has no `poll`; the HTTP layer
//! (`courier-kernel`) calls [`HttpIngress::submit`] directly from its route
//! handler, which feeds the shared orchestrator channel.

use chrono::Utc;
use courier_core::{Channel, Sender};
use serde_json::json;
use tokio::sync::mpsc;

use crate::types::InboundMessage;

/// Accepts `{sender, text, channel_hint?}` task submissions and forwards
/// them as `InboundMessage`s from the synthetic `Http` channel onto the
/// shared orchestrator queue.
#[derive(Clone)]
pub struct HttpIngress {
    sender: mpsc::Sender<InboundMessage>,
}

impl HttpIngress {
    /// Wrap the orchestrator's shared inbound queue.
    #[must_use]
    pub fn new(sender: mpsc::Sender<InboundMessage>) -> Self {
        Self { sender }
    }

    /// Submit one task, assigning it a fresh synthetic id. Returns the id so
    /// the HTTP caller can poll for the resulting run's status.
    pub async fn submit(
        &self,
        sender: &str,
        text: &str,
        channel_hint: Option<&str>,
    ) -> Result<String, mpsc::error::SendError<InboundMessage>> {
        let id = format!("http:{}", uuid::Uuid::new_v4());
        let message = InboundMessage {
            id: id.clone(),
            channel: Channel::Http,
            sender: Sender::normalize(sender),
            text: text.to_string(),
            received_at: Utc::now(),
            is_self: false,
            attachments: Vec::new(),
            context_metadata: json!({ "channel_hint": channel_hint }),
        };
        self.sender.send(message).await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_forwards_a_synthetic_http_message() {
        let (tx, mut rx) = mpsc::channel(8);
        let ingress = HttpIngress::new(tx);
        ingress.submit("alice@example.com", "do a thing", None).await.unwrap();
        let message = rx.recv().await.unwrap();
        assert_eq!(message.channel, Channel::Http);
        assert_eq!(message.text, "do a thing");
    }
}
