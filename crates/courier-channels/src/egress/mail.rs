//! The mail writer: sends a threaded reply via
//! [`PlatformScripting`].

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Channel, Sender};

use crate::egress::escaped_chunks;
use crate::error::{EgressResult, WithChannel};
use crate::fingerprint::FingerprintCache;
use crate::scripting::PlatformScripting;
use crate::types::DeliveryStatus;
use crate::EgressAdapter;

/// Writes replies into the mail client.
pub struct MailEgress {
    scripting: Arc<dyn PlatformScripting>,
    fingerprints: Arc<FingerprintCache>,
    max_chunk_chars: usize,
}

impl MailEgress {
    /// Build a writer over `scripting`.
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
impl EgressAdapter for MailEgress {
    fn channel(&self) -> Channel {
        Channel::Mail
    }

    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        if self.fingerprints.check_and_record(Channel::Mail, recipient, text) {
            return Ok(DeliveryStatus::Suppressed);
        }

        let chunks = escaped_chunks(text, self.max_chunk_chars);
        for chunk in &chunks {
            self.scripting
                .send_mail_reply(recipient.as_str(), chunk, thread_hint)
                .await
                .with_channel_egress_err(Channel::Mail)?;
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

    #[tokio::test]
    async fn send_threads_through_the_given_hint() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = MailEgress::new(scripting.clone(), fingerprints, 1000);
        let recipient = Sender::normalize("bob@example.com");
        egress
            .send(&recipient, "on it", Some("thread-42"))
            .await
            .unwrap();
        let sent = scripting.mail_replies_sent.lock().unwrap();
        assert_eq!(sent[0].2.as_deref(), Some("thread-42"));
    }
}
