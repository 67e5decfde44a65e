//! The calendar reader: lists events within the lookahead
//! window whose start time has elapsed. Annotating the event with the run's
//! result happens after completion, via [`PlatformScripting::annotate_calendar_event`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use courier_core::{Channel, Sender};
use serde_json::json;

use crate::error::{ChannelResult, WithChannel};
use crate::scripting::PlatformScripting;
use crate::types::InboundMessage;
use crate::IngressAdapter;

/// Reads calendar events whose start time is within the lookahead window and
/// has already elapsed.
pub struct CalendarReader {
    scripting: Arc<dyn PlatformScripting>,
    lookahead_minutes: u32,
}

impl CalendarReader {
    /// Build a reader over `scripting`, using `lookahead_minutes` as the
    /// scripting call's own window.
    #[must_use]
    pub fn new(scripting: Arc<dyn PlatformScripting>, lookahead_minutes: u32) -> Self {
        Self {
            scripting,
            lookahead_minutes,
        }
    }
}

#[async_trait]
impl IngressAdapter for CalendarReader {
    fn channel(&self) -> Channel {
        Channel::Calendar
    }

    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>> {
        let events = self
            .scripting
            .list_calendar_events(self.lookahead_minutes)
            .await
            .with_channel_err(Channel::Calendar)?;

        let now = Utc::now();
        Ok(events
            .into_iter()
            .filter(|event| event.start_at <= now)
            .map(|event| InboundMessage {
                id: format!("calendar:{}", event.id),
                channel: Channel::Calendar,
                sender: event
                    .organizer
                    .as_deref()
                    .map(Sender::normalize)
                    .unwrap_or_else(|| Sender::normalize("calendar-app")),
                text: format!("{}\n{}", event.title, event.notes),
                received_at: event.start_at,
                is_self: false,
                attachments: Vec::new(),
                context_metadata: json!({ "event_id": event.id, "title": event.title }),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::CalendarItem;
    use crate::test_support::MockScripting;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn only_elapsed_events_are_yielded() {
        let scripting = Arc::new(MockScripting::default());
        let now = Utc::now();
        scripting.calendar_events.lock().unwrap().extend([
            CalendarItem {
                id: "e1".to_string(),
                title: "standup".to_string(),
                notes: "daily".to_string(),
                organizer: None,
                start_at: now - ChronoDuration::minutes(5),
            },
            CalendarItem {
                id: "e2".to_string(),
                title: "future meeting".to_string(),
                notes: String::new(),
                organizer: None,
                start_at: now + ChronoDuration::minutes(30),
            },
        ]);
        let reader = CalendarReader::new(scripting, 60);
        let messages = reader.poll().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("standup"));
    }
}
