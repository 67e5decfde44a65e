//! The reminders writer: annotates the originating
//! reminder with the run's result, then moves it to the archive list. The
//! reminder id travels in `thread_hint` — this channel has no separate
//! "thread" concept, so the generic `EgressAdapter` contract is reused for
//! "which item this reply belongs to".

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Channel, Sender};

use crate::egress::escaped_chunks;
use crate::error::{EgressError, EgressResult, WithChannel};
use crate::fingerprint::FingerprintCache;
use crate::scripting::PlatformScripting;
use crate::types::DeliveryStatus;
use crate::EgressAdapter;

/// Writes completion annotations back onto reminders and archives them.
pub struct RemindersEgress {
    scripting: Arc<dyn PlatformScripting>,
    fingerprints: Arc<FingerprintCache>,
    archive_list: String,
    max_chunk_chars: usize,
}

impl RemindersEgress {
    /// Build a writer over `scripting`, moving completed items to
    /// `archive_list`.
    #[must_use]
    pub fn new(
        scripting: Arc<dyn PlatformScripting>,
        fingerprints: Arc<FingerprintCache>,
        archive_list: impl Into<String>,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            scripting,
            fingerprints,
            archive_list: archive_list.into(),
            max_chunk_chars,
        }
    }
}

#[async_trait]
impl EgressAdapter for RemindersEgress {
    fn channel(&self) -> Channel {
        Channel::Reminders
    }

    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        let reminder_id = thread_hint.ok_or_else(|| {
            EgressError::new(Channel::Reminders, "missing reminder id in thread_hint")
        })?;

        if self.fingerprints.check_and_record(Channel::Reminders, recipient, text) {
            return Ok(DeliveryStatus::Suppressed);
        }

        let chunks = escaped_chunks(text, self.max_chunk_chars);
        let note = chunks.join("");
        self.scripting
            .annotate_reminder(reminder_id, &note)
            .await
            .with_channel_egress_err(Channel::Reminders)?;
        self.scripting
            .move_reminder(reminder_id, &self.archive_list)
            .await
            .with_channel_egress_err(Channel::Reminders)?;

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
    async fn send_annotates_and_archives() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = RemindersEgress::new(scripting.clone(), fingerprints, "Archive", 1000);
        let recipient = Sender::normalize("reminders-app");
        egress.send(&recipient, "done", Some("r1")).await.unwrap();
        assert_eq!(scripting.reminders_annotated.lock().unwrap()[0].0, "r1");
        assert_eq!(
            scripting.reminders_moved.lock().unwrap()[0],
            ("r1".to_string(), "Archive".to_string())
        );
    }

    #[tokio::test]
    async fn missing_thread_hint_is_rejected() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = RemindersEgress::new(scripting, fingerprints, "Archive", 1000);
        let recipient = Sender::normalize("reminders-app");
        let err = egress.send(&recipient, "done", None).await.unwrap_err();
        assert_eq!(err.channel, Channel::Reminders);
    }
}
