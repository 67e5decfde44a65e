//! Maps a [`Channel`] to the [`EgressAdapter`] that writes replies back onto
//! it. HTTP has no adapter: task results are read back
//! through the admin API, never pushed.

use std::collections::HashMap;
use std::sync::Arc;

use courier_channels::{DeliveryStatus, EgressAdapter, EgressResult};
use courier_core::{Channel, Sender};

use crate::error::SchedulerError;

/// Owns one [`EgressAdapter`] per channel.
#[derive(Clone, Default)]
pub struct EgressRegistry {
    adapters: HashMap<Channel, Arc<dyn EgressAdapter>>,
}

impl EgressRegistry {
    /// Build an empty registry; callers register one adapter per enabled channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register `adapter` for the channel it reports via `channel()`.
    pub fn register(&mut self, adapter: Arc<dyn EgressAdapter>) {
        self.adapters.insert(adapter.channel(), adapter);
    }

    /// Send `text` to `recipient` on `channel`, threading on `thread_hint`
    /// when the adapter supports it. `Channel::Http` has no adapter and is
    /// not an error to look up — callers should check for it before calling.
    pub async fn send(
        &self,
        channel: Channel,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> EgressResult<DeliveryStatus> {
        match self.adapters.get(&channel) {
            Some(adapter) => adapter.send(recipient, text, thread_hint).await,
            None => Err(courier_channels::EgressError::new(
                channel,
                "no egress adapter registered",
            )),
        }
    }

    /// As [`Self::send`], but wraps the lookup failure as a [`SchedulerError`]
    /// for callers in the proactive loops rather than `courier-channels`'s
    /// `EgressError`.
    pub async fn send_for_scheduler(
        &self,
        channel: Channel,
        recipient: &Sender,
        text: &str,
        thread_hint: Option<&str>,
    ) -> Result<DeliveryStatus, SchedulerError> {
        if !self.adapters.contains_key(&channel) {
            return Err(SchedulerError::NoEgressAdapter(channel));
        }
        Ok(self.send(channel, recipient, text, thread_hint).await?)
    }
}
