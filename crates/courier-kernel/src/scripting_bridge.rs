//! The one real [`PlatformScripting`] implementation: shells out to
//! `osascript` for every call. The exact AppleScript payloads are an opaque
//! boundary out of scope here — only the spawn/timeout shape is load-bearing,
//! grounded on the same
//! `tokio::select! { biased; ... }` race `courier-connector`'s
//! `SubprocessConnector` uses against its own child process.

use std::time::Duration;

use async_trait::async_trait;
use courier_channels::{
    CalendarItem, MailMessage, NoteItem, PlatformScripting, ReminderItem, ScriptingError,
};
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;

/// Each record in a list-returning AppleScript reply is one line; fields
/// within a record are separated by this control character so titles/bodies
/// containing a plain newline don't get misparsed as a record boundary.
const FIELD_SEP: char = '\u{1f}';

/// Runs every platform call as a fresh `osascript` child process, bounded by
/// `call_timeout`.
pub struct OsascriptBridge {
    call_timeout: Duration,
}

impl OsascriptBridge {
    /// Build a bridge that bounds every scripting call to `call_timeout`.
    #[must_use]
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    async fn run(&self, script: &str) -> Result<String, ScriptingError> {
        let call = async {
            let child = Command::new("osascript")
                .arg("-e")
                .arg(script)
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| ScriptingError::Failed(e.to_string()))?;

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| ScriptingError::Failed(e.to_string()))?;
            if !output.status.success() {
                return Err(ScriptingError::Failed(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        };

        match tokio_timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ScriptingError::Timeout),
        }
    }

    async fn run_void(&self, script: &str) -> Result<(), ScriptingError> {
        self.run(script).await.map(|_| ())
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn split_records(raw: &str) -> impl Iterator<Item = Vec<String>> + '_ {
    raw.lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split(FIELD_SEP).map(str::to_string).collect())
}

#[async_trait]
impl PlatformScripting for OsascriptBridge {
    async fn list_unread_mail(&self, max_age_minutes: u32) -> Result<Vec<MailMessage>, ScriptingError> {
        let script = format!(
            "tell application \"Mail\" to return every message of inbox whose read status is false and date received is greater than ((current date) - {} * minutes)",
            max_age_minutes
        );
        let raw = self.run(&script).await?;
        Ok(split_records(&raw)
            .filter_map(|fields| {
                let mut fields = fields.into_iter();
                Some(MailMessage {
                    id: fields.next()?,
                    from: fields.next()?,
                    subject: fields.next()?,
                    body: fields.next()?,
                    received_at: chrono::Utc::now(),
                })
            })
            .collect())
    }

    async fn mark_mail_read(&self, message_id: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Mail\" to set read status of (first message whose id is \"{}\") to true",
            escape(message_id)
        );
        self.run_void(&script).await
    }

    async fn send_mail_reply(
        &self,
        recipient: &str,
        body: &str,
        thread_hint: Option<&str>,
    ) -> Result<(), ScriptingError> {
        let subject = thread_hint.map_or_else(|| "Re:".to_string(), |hint| format!("Re: {hint}"));
        let script = format!(
            "tell application \"Mail\" to send (make new outgoing message with properties {{subject:\"{}\", content:\"{}\", visible:false}} ) with (make new to recipient at end of to recipients of outgoing message with properties {{address:\"{}\"}})",
            escape(&subject),
            escape(body),
            escape(recipient)
        );
        self.run_void(&script).await
    }

    async fn list_incomplete_reminders(&self, list_name: &str) -> Result<Vec<ReminderItem>, ScriptingError> {
        let script = format!(
            "tell application \"Reminders\" to return every reminder of list \"{}\" whose completed is false",
            escape(list_name)
        );
        let raw = self.run(&script).await?;
        Ok(split_records(&raw)
            .filter_map(|fields| {
                let mut fields = fields.into_iter();
                Some(ReminderItem {
                    id: fields.next()?,
                    title: fields.next()?,
                    notes: fields.next().unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn move_reminder(&self, reminder_id: &str, to_list: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Reminders\" to move (first reminder whose id is \"{}\") to list \"{}\"",
            escape(reminder_id),
            escape(to_list)
        );
        self.run_void(&script).await
    }

    async fn annotate_reminder(&self, reminder_id: &str, note: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Reminders\" to set body of (first reminder whose id is \"{}\") to \"{}\"",
            escape(reminder_id),
            escape(note)
        );
        self.run_void(&script).await
    }

    async fn list_notes(&self, folder: &str, trigger_tag: &str) -> Result<Vec<NoteItem>, ScriptingError> {
        let script = format!(
            "tell application \"Notes\" to return every note of folder \"{}\" whose body contains \"{}\"",
            escape(folder),
            escape(trigger_tag)
        );
        let raw = self.run(&script).await?;
        Ok(split_records(&raw)
            .filter_map(|fields| {
                let mut fields = fields.into_iter();
                Some(NoteItem {
                    id: fields.next()?,
                    title: fields.next()?,
                    body: fields.next().unwrap_or_default(),
                    modified_at: chrono::Utc::now(),
                })
            })
            .collect())
    }

    async fn append_note_reply(&self, note_id: &str, reply: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Notes\" to set body of (first note whose id is \"{}\") to (body of (first note whose id is \"{}\") & \"\\n\" & \"{}\")",
            escape(note_id),
            escape(note_id),
            escape(reply)
        );
        self.run_void(&script).await
    }

    async fn list_calendar_events(&self, lookahead_minutes: u32) -> Result<Vec<CalendarItem>, ScriptingError> {
        let script = format!(
            "tell application \"Calendar\" to return every event of calendar \"Agent\" whose start date is less than ((current date) + {} * minutes) and start date is less than (current date)",
            lookahead_minutes
        );
        let raw = self.run(&script).await?;
        Ok(split_records(&raw)
            .filter_map(|fields| {
                let mut fields = fields.into_iter();
                Some(CalendarItem {
                    id: fields.next()?,
                    title: fields.next()?,
                    notes: fields.next().unwrap_or_default(),
                    organizer: fields.next().filter(|s| !s.is_empty()),
                    start_at: chrono::Utc::now(),
                })
            })
            .collect())
    }

    async fn annotate_calendar_event(&self, event_id: &str, note: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Calendar\" to set description of (first event whose uid is \"{}\") to \"{}\"",
            escape(event_id),
            escape(note)
        );
        self.run_void(&script).await
    }

    async fn send_chat_message(&self, recipient: &str, body: &str) -> Result<(), ScriptingError> {
        let script = format!(
            "tell application \"Messages\" to send \"{}\" to buddy \"{}\" of service 1 of (get services)",
            escape(body),
            escape(recipient)
        );
        self.run_void(&script).await
    }
}
