//! The injected platform-scripting boundary: the actual AppleScript/EventKit-
//! equivalent calls are out of scope, so every reader/writer that needs one
//! takes an
//! `Arc<dyn PlatformScripting>` instead of shelling out itself. A real
//! implementation and this crate's mock both implement the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScriptingError;

/// One unread mail message, as reported by the platform mail client.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// The platform's stable message identifier.
    pub id: String,
    /// The sender address, unnormalized.
    pub from: String,
    /// The subject line.
    pub subject: String,
    /// The plain-text body.
    pub body: String,
    /// When the mail client reports the message as received.
    pub received_at: DateTime<Utc>,
}

/// One incomplete reminder in a designated list.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderItem {
    /// The platform's stable reminder identifier.
    pub id: String,
    /// The reminder's title.
    pub title: String,
    /// Free-form notes attached to the reminder.
    pub notes: String,
}

/// One note in a designated folder.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteItem {
    /// The platform's stable note identifier.
    pub id: String,
    /// The note's title.
    pub title: String,
    /// The note's body text.
    pub body: String,
    /// When the note was last modified.
    pub modified_at: DateTime<Utc>,
}

/// One calendar event within the lookahead window.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarItem {
    /// The platform's stable event identifier.
    pub id: String,
    /// The event's title.
    pub title: String,
    /// Free-form notes attached to the event.
    pub notes: String,
    /// The organizer's address, if the platform reports one.
    pub organizer: Option<String>,
    /// The event's scheduled start time.
    pub start_at: DateTime<Utc>,
}

/// The platform calls the five channel readers/writers need, abstracted
/// behind a trait so they are unit-testable against a mock.
#[async_trait]
pub trait PlatformScripting: Send + Sync {
    /// Unread mail messages no older than `max_age_minutes`.
    async fn list_unread_mail(&self, max_age_minutes: u32) -> Result<Vec<MailMessage>, ScriptingError>;
    /// Mark a mail message as read.
    async fn mark_mail_read(&self, message_id: &str) -> Result<(), ScriptingError>;
    /// Send a reply in the mail client, optionally threaded.
    async fn send_mail_reply(
        &self,
        recipient: &str,
        body: &str,
        thread_hint: Option<&str>,
    ) -> Result<(), ScriptingError>;

    /// Incomplete reminders in `list_name`.
    async fn list_incomplete_reminders(
        &self,
        list_name: &str,
    ) -> Result<Vec<ReminderItem>, ScriptingError>;
    /// Move a reminder to a different list (the archive list, once processed).
    async fn move_reminder(&self, reminder_id: &str, to_list: &str) -> Result<(), ScriptingError>;
    /// Append a completion note to a reminder.
    async fn annotate_reminder(&self, reminder_id: &str, note: &str) -> Result<(), ScriptingError>;

    /// Notes in `folder` whose body contains `trigger_tag`.
    async fn list_notes(
        &self,
        folder: &str,
        trigger_tag: &str,
    ) -> Result<Vec<NoteItem>, ScriptingError>;
    /// Append a reply to a note's body.
    async fn append_note_reply(&self, note_id: &str, reply: &str) -> Result<(), ScriptingError>;

    /// Events starting within `lookahead_minutes` whose start has elapsed.
    async fn list_calendar_events(
        &self,
        lookahead_minutes: u32,
    ) -> Result<Vec<CalendarItem>, ScriptingError>;
    /// Annotate an event with the run's result, once processed.
    async fn annotate_calendar_event(&self, event_id: &str, note: &str) -> Result<(), ScriptingError>;

    /// Send a chat message to `recipient`.
    async fn send_chat_message(&self, recipient: &str, body: &str) -> Result<(), ScriptingError>;
}
