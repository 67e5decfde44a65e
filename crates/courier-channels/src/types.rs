//! Shared data shapes crossing the ingress/egress boundary.

use chrono::{DateTime, Utc};
use courier_core::{Channel, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A small description of an attachment carried alongside an inbound
/// message. Contents are never fetched or stored, only described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// The attachment's display name (filename, as reported by the source).
    pub name: String,
    /// Size in bytes, as reported by the source.
    pub size_bytes: u64,
    /// A short textual preview, when the source can produce one cheaply.
    pub preview: Option<String>,
}

/// One message yielded by an [`crate::IngressAdapter::poll`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// A stable identifier unique within its channel, used for dedupe
    /// (`record_message`'s `external_id`).
    pub id: String,
    /// The channel this message arrived on.
    pub channel: Channel,
    /// The normalized sender identity.
    pub sender: Sender,
    /// The raw message text, trigger tag and prefix still present.
    pub text: String,
    /// When the source reported the message as received.
    pub received_at: DateTime<Utc>,
    /// Whether the source platform reports this as the daemon's own prior
    /// outbound message (e.g. an "from me" flag in the chat store).
    pub is_self: bool,
    /// Attachment descriptions, if any.
    pub attachments: Vec<Attachment>,
    /// Channel-specific context (e.g. a mail subject, a calendar event id)
    /// carried through to prompt assembly and to the stored run row.
    pub context_metadata: Value,
}

/// The result of one [`crate::EgressAdapter::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// The text was sent, split into this many ordered chunks.
    Sent {
        /// Number of chunks the text was split into before sending.
        chunks: u32,
    },
    /// The send was dropped because an identical fingerprint was still live
    /// in the suppression window.
    Suppressed,
}
