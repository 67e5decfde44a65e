//! The Ingress and Egress sets: five channel adapters bridging a chat
//! database, a mail client, a reminders app, a notes app, and a calendar,
//! plus the HTTP task endpoint.
//!
//! Every reader implements [`IngressAdapter`], every writer implements
//! [`EgressAdapter`] — both grounded on the existing `InboundAdapter`/
//! `OutboundAdapter` traits (`astrid-core::connector`), generalized from a
//! single-subscriber `mpsc` push model to an explicit poll-then-mark pull
//! model, since these five sources are pull-based rather than push-based.
//! The one exception is the HTTP task endpoint, which remains push-based and
//! feeds a shared `mpsc::Sender<InboundMessage>` directly.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod chunk;
mod error;
mod fingerprint;
pub mod ingress;
pub mod egress;
mod scripting;
#[cfg(test)]
mod test_support;
mod types;

pub use chunk::chunk_text;
pub use error::{ChannelError, ChannelResult, EgressError, EgressResult, ScriptingError};
pub use fingerprint::FingerprintCache;
pub use scripting::{CalendarItem, MailMessage, NoteItem, PlatformScripting, ReminderItem};
pub use types::{Attachment, DeliveryStatus, InboundMessage};

use async_trait::async_trait;
use courier_core::{Channel, Sender};

/// A pull-based channel reader. `poll` must yield a message exactly once:
/// if marking it processed fails, it must not be returned: all-or-nothing
/// per item.
#[async_trait]
pub trait IngressAdapter: Send + Sync {
    /// The channel this adapter reads.
    fn channel(&self) -> Channel;

    /// Fetch and mark as processed whatever new items are available.
    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>>;
}

/// A channel writer. Implementations are responsible for escaping,
/// chunking, and fingerprint suppression; `send` returns
/// `Ok` even when the send was suppressed as a duplicate.
#[async_trait]
pub trait EgressAdapter: Send + Sync {
    /// The channel this adapter writes.
    fn channel(&self) -> Channel;

    /// Send `text` to `recipient`, threading on `thread_hint` when the
    /// channel supports it.
    async fn send(
        &self,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus>;
}
