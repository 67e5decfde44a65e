//! A configurable [`PlatformScripting`] mock shared by every adapter's tests.

#![cfg(test)]

use std::sync::Mutex;

use async_trait::async_trait;

use crate::scripting::{CalendarItem, MailMessage, NoteItem, PlatformScripting, ReminderItem};
use crate::ScriptingError;

/// Canned responses plus call logs, so a test can assert both "what came
/// back" and "what side effects were requested".
#[derive(Default)]
pub struct MockScripting {
    pub unread_mail: Mutex<Vec<MailMessage>>,
    pub reminders: Mutex<Vec<ReminderItem>>,
    pub notes: Mutex<Vec<NoteItem>>,
    pub calendar_events: Mutex<Vec<CalendarItem>>,
    pub fail_next: Mutex<Option<ScriptingError>>,

    pub marked_read: Mutex<Vec<String>>,
    pub mail_replies_sent: Mutex<Vec<(String, String, Option<String>)>>,
    pub reminders_moved: Mutex<Vec<(String, String)>>,
    pub reminders_annotated: Mutex<Vec<(String, String)>>,
    pub notes_replied: Mutex<Vec<(String, String)>>,
    pub events_annotated: Mutex<Vec<(String, String)>>,
    pub chat_sent: Mutex<Vec<(String, String)>>,
}

impl MockScripting {
    fn take_failure(&self) -> Option<ScriptingError> {
        self.fail_next.lock().unwrap().take()
    }
}

#[async_trait]
impl PlatformScripting for MockScripting {
    async fn list_unread_mail(&self, _max_age_minutes: u32) -> Result<Vec<MailMessage>, ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.unread_mail.lock().unwrap().clone())
    }

    async fn mark_mail_read(&self, message_id: &str) -> Result<(), ScriptingError> {
        self.marked_read.lock().unwrap().push(message_id.to_string());
        Ok(())
    }

    async fn send_mail_reply(
        &self,
        recipient: &str,
        body: &str,
        thread_hint: Option<&str>,
    ) -> Result<(), ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.mail_replies_sent.lock().unwrap().push((
            recipient.to_string(),
            body.to_string(),
            thread_hint.map(str::to_string),
        ));
        Ok(())
    }

    async fn list_incomplete_reminders(&self, _list_name: &str) -> Result<Vec<ReminderItem>, ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.reminders.lock().unwrap().clone())
    }

    async fn move_reminder(&self, reminder_id: &str, to_list: &str) -> Result<(), ScriptingError> {
        self.reminders_moved
            .lock()
            .unwrap()
            .push((reminder_id.to_string(), to_list.to_string()));
        Ok(())
    }

    async fn annotate_reminder(&self, reminder_id: &str, note: &str) -> Result<(), ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.reminders_annotated
            .lock()
            .unwrap()
            .push((reminder_id.to_string(), note.to_string()));
        Ok(())
    }

    async fn list_notes(&self, _folder: &str, _trigger_tag: &str) -> Result<Vec<NoteItem>, ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn append_note_reply(&self, note_id: &str, reply: &str) -> Result<(), ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.notes_replied
            .lock()
            .unwrap()
            .push((note_id.to_string(), reply.to_string()));
        Ok(())
    }

    async fn list_calendar_events(&self, _lookahead_minutes: u32) -> Result<Vec<CalendarItem>, ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.calendar_events.lock().unwrap().clone())
    }

    async fn annotate_calendar_event(&self, event_id: &str, note: &str) -> Result<(), ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.events_annotated
            .lock()
            .unwrap()
            .push((event_id.to_string(), note.to_string()));
        Ok(())
    }

    async fn send_chat_message(&self, recipient: &str, body: &str) -> Result<(), ScriptingError> {
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        self.chat_sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}
