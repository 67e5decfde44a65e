//! The calendar writer: annotates the originating event
//! with the run's result. The event id travels in `thread_hint`, as with
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

/// Writes completion annotations back onto calendar events.
pub struct CalendarEgress {
    scripting: Arc<dyn PlatformScripting>,
    fingerprints: Arc<FingerprintCache>,
    max_chunk_chars: usize,
}

impl CalendarEgress {
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
impl EgressAdapter for CalendarEgress {
    fn channel(&self) -> Channel {
        Channel::Calendar
    }

    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        let event_id = thread_hint
            .ok_or_else(|| EgressError::new(Channel::Calendar, "missing event id in thread_hint"))?;

        if self.fingerprints.check_and_record(Channel::Calendar, recipient, text) {
            return Ok(DeliveryStatus::Suppressed);
        }

        let chunks = escaped_chunks(text, self.max_chunk_chars);
        let note = chunks.join("");
        self.scripting
            .annotate_calendar_event(event_id, &note)
            .await
            .with_channel_egress_err(Channel::Calendar)?;

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
    async fn send_annotates_the_event() {
        let scripting = Arc::new(MockScripting::default());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let egress = CalendarEgress::new(scripting.clone(), fingerprints, 1000);
        let recipient = Sender::normalize("calendar-app");
        egress.send(&recipient, "done", Some("e1")).await.unwrap();
        assert_eq!(scripting.events_annotated.lock().unwrap()[0].0, "e1");
    }
}
