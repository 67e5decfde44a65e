//! The chat writer: sends via [`PlatformScripting`] (the
//! chat reader reads the platform store directly, but replies still go out
//! through the scripting boundary, e.g. a Messages.app-equivalent send).

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Channel, Sender};

use crate::egress::escaped_chunks;
use crate::error::{EgressResult, WithChannel};
use crate::fingerprint::FingerprintCache;
use crate::scripting::PlatformScripting;
use crate::types::DeliveryStatus;
use crate::EgressAdapter;

/// Writes replies back into the chat channel.
pub struct ChatEgress {
    scripting: Arc<dyn PlatformScripting>,
    fingerprints: Arc<FingerprintCache>,
    max_chunk_chars: usize,
}

impl ChatEgress {
    /// Build a writer over `scripting`, sharing `fingerprints` with the
    /// chat reader's self-echo check.
    #[must_use]
    pub fn new(
        scripting: Arc<dyn PlatformScripting>,
        fingerprints: Arc<FingerprintCache>,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            scripting,
            fingerprints,
            max_chunk_chars,
        }
    }
}

#[async_trait]
impl EgressAdapter for ChatEgress {
    fn channel(&self) -> Channel {
        Channel::Chat
    }

    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        _thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        if self.fingerprints.check_and_record(Channel::Chat, recipient, text) {
            return Ok(DeliveryStatus::Suppressed);
        }

        let chunks = escaped_chunks(text, self.max_chunk_chars);
        for chunk in &chunks {
            self.scripting
                .send_chat_message(recipient.as_str(), chunk)
                .await
                .with_channel_egress_err(Channel::Chat)?;
        }
        Ok(DeliveryStatus::Sent {
            chunks: chunks.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockScripting;
    use std::time::Duration;

    fn recipient() -> Sender {
        Sender::normalize("+15551234567")
    }

    #[tokio::test]
    async fn send_dispatches_through_scripting() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = ChatEgress::new(scripting.clone(), fingerprints, 1000);
        let status = egress.send(&recipient(), "hello", None).await.unwrap();
        assert_eq!(status, DeliveryStatus::Sent { chunks: 1 });
        assert_eq!(scripting.chat_sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_send_within_window_is_suppressed() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = ChatEgress::new(scripting.clone(), fingerprints, 1000);
        egress.send(&recipient(), "hello", None).await.unwrap();
        let status = egress.send(&recipient(), "hello", None).await.unwrap();
        assert_eq!(status, DeliveryStatus::Suppressed);
        assert_eq!(scripting.chat_sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn long_text_is_sent_in_multiple_chunks() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = ChatEgress::new(scripting.clone(), fingerprints, 4);
        let status = egress.send(&recipient(), "abcdefgh", None).await.unwrap();
        assert_eq!(status, DeliveryStatus::Sent { chunks: 2 });
        assert_eq!(scripting.chat_sent.lock().unwrap().len(), 2);
    }
}
