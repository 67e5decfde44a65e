//! Prelude module - commonly used types for convenient import.

pub use crate::{CourierEvent, EventMetadata};
pub use crate::{EventBus, EventReceiver, DEFAULT_CHANNEL_CAPACITY};
