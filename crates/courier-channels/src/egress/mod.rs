//! The five channel writers. The HTTP admin surface has no
//! writer here: HTTP-originated tasks are polled for status through the
//! admin API (`courier-kernel`), not pushed back out.

mod calendar;
mod chat;
mod mail;
mod notes;
mod reminders;

pub use calendar::CalendarEgress;
pub use chat::ChatEgress;
pub use mail::MailEgress;
pub use notes::NotesEgress;
pub use reminders::RemindersEgress;

use crate::chunk::chunk_text;

/// Chunk `text` to `max_chars`, escaping each chunk independently so an
/// escape sequence (`\\`, `\"`, `\n`) is never split across a chunk boundary.
pub(crate) fn escaped_chunks(text: &str, max_chars: usize) -> Vec<String> {
    chunk_text(text, max_chars)
        .into_iter()
        .map(|chunk| courier_core::util::escape_for_scripting(&chunk))
        .collect()
}
