//! The notes writer: appends the run's result to the
//! originating note. The note id travels in `thread_hint`, as with
//! [`crate::egress::RemindersEgress`].

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{Channel, Sender};

use crate::egress::escaped_chunks;
use crate::error::{EgressError, EgressResult, WithChannel};
use crate::fingerprint::FingerprintCache;
use crate::scripting::PlatformScripting;
use crate::types::DeliveryStatus;
use crate::EgressAdapter;

/// Writes replies back into the originating note's body.
pub struct NotesEgress {
    scripting: Arc<dyn PlatformScripting>,
    fingerprints: Arc<FingerprintCache>,
    max_chunk_chars: usize,
}

impl NotesEgress {
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
impl EgressAdapter for NotesEgress {
    fn channel(&self) -> Channel {
        Channel::Notes
    }

    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        let note_id = thread_hint
            .ok_or_else(|| EgressError::new(Channel::Notes, "missing note id in thread_hint"))?;

        if self.fingerprints.check_and_record(Channel::Notes, recipient, text) {
            return Ok(DeliveryStatus::Suppressed);
        }

        let chunks = escaped_chunks(text, self.max_chunk_chars);
        let reply = chunks.join("");
        self.scripting
            .append_note_reply(note_id, &reply)
            .await
            .with_channel_egress_err(Channel::Notes)?;

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
    async fn send_appends_the_reply() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = NotesEgress::new(scripting.clone(), fingerprints, 1000);
        let recipient = Sender::normalize("notes-app");
        egress.send(&recipient, "done", Some("n1")).await.unwrap();
        assert_eq!(scripting.notes_replied.lock().unwrap()[0].0, "n1");
    }
}
