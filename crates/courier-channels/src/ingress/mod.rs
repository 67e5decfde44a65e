//! The five pull-based channel readers plus the HTTP push-based task
//! endpoint.

mod calendar;
mod chat;
mod http;
mod mail;
mod notes;
mod reminders;

pub use calendar::CalendarReader;
pub use chat::ChatReader;
pub use http::HttpIngress;
pub use mail::MailReader;
pub use notes::NotesReader;
pub use reminders::RemindersReader;
