//! Builds the enabled channel adapters from [`courier_config::Config`] and
//! wires each ingress poller into the shared inbound `mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use courier_channels::{
    egress, ingress, ChannelError, FingerprintCache, IngressAdapter, InboundMessage,
    PlatformScripting,
};
use courier_config::Config;
use courier_core::Channel;
use courier_orchestrator::EgressRegistry;
use courier_storage::Store;
use tokio::sync::mpsc;
use tracing::warn;

/// How often each pull-based ingress adapter is polled. Not itself a
/// configured setting — the five sources are polled on a fixed, short
/// cadence regardless of which are enabled, since the cost of an extra poll
/// is one scripting call against an already-open connection or app.
const INGRESS_POLL_INTERVAL: Duration = Duration::from_secs(10);

fn chunk_chars_for(config: &Config, channel: Channel) -> usize {
    config
        .channels
        .max_chunk_chars
        .get(channel.as_str())
        .copied()
        .unwrap_or(1000)
}

/// Every enabled ingress reader, ready to be polled.
pub fn build_ingress_adapters(
    config: &Config,
    store: &Arc<dyn Store>,
    fingerprints: &Arc<FingerprintCache>,
    scripting: &Arc<dyn PlatformScripting>,
) -> Vec<Arc<dyn IngressAdapter>> {
    let mut adapters: Vec<Arc<dyn IngressAdapter>> = Vec::new();

    if config.channels.chat_enabled {
        let chat = ingress::ChatReader::new(
            shellexpand_home(&config.channels.chat_db_path),
            Arc::clone(store),
            Arc::clone(fingerprints),
            config.senders.allowed.clone(),
            config.channels.chat_filter_senders_at_source,
        );
        if !config.channels.process_historical_on_first_run {
            if let Err(e) = chat.skip_existing_backlog() {
                warn!(%e, "failed to seed the chat cursor; historical messages may be replayed");
            }
        }
        adapters.push(Arc::new(chat));
    }
    if config.channels.mail_enabled {
        adapters.push(Arc::new(ingress::MailReader::new(
            Arc::clone(scripting),
            config.channels.mail_max_age_minutes,
        )));
    }
    if config.channels.reminders_enabled {
        adapters.push(Arc::new(ingress::RemindersReader::new(
            Arc::clone(scripting),
            config.channels.reminders_list.clone(),
        )));
    }
    if config.channels.notes_enabled {
        adapters.push(Arc::new(ingress::NotesReader::new(
            Arc::clone(scripting),
            config.channels.notes_folder.clone(),
            config.trigger_tag.clone(),
            Duration::from_secs(config.timeouts.scripting_call_secs),
            3,
        )));
    }
    if config.channels.calendar_enabled {
        adapters.push(Arc::new(ingress::CalendarReader::new(
            Arc::clone(scripting),
            config.channels.calendar_lookahead_minutes,
        )));
    }

    adapters
}

/// Every enabled egress writer, registered against its channel.
pub fn build_egress_registry(
    config: &Config,
    fingerprints: &Arc<FingerprintCache>,
    scripting: &Arc<dyn PlatformScripting>,
) -> EgressRegistry {
    let mut registry = EgressRegistry::new();

    if config.channels.chat_enabled {
        registry.register(Arc::new(egress::ChatEgress::new(
            Arc::clone(scripting),
            Arc::clone(fingerprints),
            chunk_chars_for(config, Channel::Chat),
        )));
    }
    if config.channels.mail_enabled {
        registry.register(Arc::new(egress::MailEgress::new(
            Arc::clone(scripting),
            Arc::clone(fingerprints),
            chunk_chars_for(config, Channel::Mail),
        )));
    }
    if config.channels.reminders_enabled {
        registry.register(Arc::new(egress::RemindersEgress::new(
            Arc::clone(scripting),
            Arc::clone(fingerprints),
            config.channels.reminders_archive_list.clone(),
            chunk_chars_for(config, Channel::Reminders),
        )));
    }
    if config.channels.notes_enabled {
        registry.register(Arc::new(egress::NotesEgress::new(
            Arc::clone(scripting),
            Arc::clone(fingerprints),
            chunk_chars_for(config, Channel::Notes),
        )));
    }
    if config.channels.calendar_enabled {
        registry.register(Arc::new(egress::CalendarEgress::new(
            Arc::clone(scripting),
            Arc::clone(fingerprints),
            chunk_chars_for(config, Channel::Calendar),
        )));
    }

    registry
}

fn shellexpand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::UserDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    std::path::PathBuf::from(path)
}

/// Spawn one polling task per ingress adapter, forwarding whatever each
/// `poll()` yields into the shared inbound channel until shutdown fires.
pub fn spawn_ingress_pollers(
    adapters: Vec<Arc<dyn IngressAdapter>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    for adapter in adapters {
        let inbound_tx = inbound_tx.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(INGRESS_POLL_INTERVAL);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        poll_once(adapter.as_ref(), &inbound_tx).await;
                    }
                }
            }
        });
    }
}

async fn poll_once(adapter: &dyn IngressAdapter, inbound_tx: &mpsc::Sender<InboundMessage>) {
    match adapter.poll().await {
        Ok(messages) => {
            for message in messages {
                if inbound_tx.send(message).await.is_err() {
                    warn!(channel = %adapter.channel(), "inbound channel closed, dropping polled message");
                }
            }
        }
        Err(ChannelError { channel, reason }) => {
            warn!(%channel, %reason, "ingress poll failed");
        }
    }
}
