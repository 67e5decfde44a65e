//! The orchestrator's shared handle: one instance built at daemon startup
//! and cloned into the router, the turn runner, and each proactive loop.

use std::sync::Arc;

use courier_approval::ApprovalManager;
use courier_channels::{EgressAdapter, PlatformScripting};
use courier_config::Config;
use courier_connector::Connector;
use courier_core::{Channel, Sender};
use courier_events::EventBus;
use courier_policy::{Policy, RateLimiter};
use courier_storage::Store;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;

use crate::egress_registry::EgressRegistry;

/// The key-value entry backing the process-wide mute flag. Global mutable
/// state lives in the store, not in process memory, so every dispatch reads
/// the current value rather than a snapshot taken at startup or by some
/// other task.
const MUTED_KV_KEY: &str = "system.muted";

/// Per-`(channel, sender)` serialization lock, generalizing a per-session
/// mutex to courier's lack of an in-process session object
/// (`Store::create_session` is an atomic upsert with no handle to lock on).
/// Guarantees that a sender's messages on one channel are processed in
/// arrival order, and that an approval resolution is observed before any
/// later message dispatches.
pub type SenderLocks = DashMap<(Channel, Sender), Arc<AsyncMutex<()>>>;

/// Everything the router, the turn runner, and the proactive loops share.
#[derive(Clone)]
pub struct OrchestratorCtx {
    /// Resolved configuration, loaded once at startup.
    pub config: Arc<Config>,
    /// Durable store: sessions, runs, approvals, events, scheduled actions.
    pub store: Arc<dyn Store>,
    /// Inbound acceptance policy (allowlist, self-echo, trigger tag, rate limit).
    pub policy: Arc<Policy>,
    /// Approval lifecycle (create / resolve / expire).
    pub approvals: Arc<ApprovalManager>,
    /// The AI subprocess connector turns are dispatched to.
    pub connector: Arc<dyn Connector>,
    /// Per-channel reply adapters.
    pub egress: Arc<EgressRegistry>,
    /// In-process event fan-out to the HTTP admin surface and logs.
    pub events: EventBus,
    /// Rate limiter for the Companion Loop's own proactive sends, keyed by a
    /// synthetic sender distinct from any real inbound sender.
    pub proactive_rate_limiter: Arc<RateLimiter>,
    /// Per-`(channel, sender)` ordering locks.
    pub sender_locks: Arc<SenderLocks>,
    /// The platform scripting bridge, used by the Companion Loop to read
    /// calendar events, reminders, and notes directly when synthesizing a
    /// proactive observation brief.
    pub scripting: Arc<dyn PlatformScripting>,
}

impl OrchestratorCtx {
    /// Assemble a new context. `egress` is built by the caller once every
    /// enabled channel's adapters are constructed.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        connector: Arc<dyn Connector>,
        egress: EgressRegistry,
        events: EventBus,
        scripting: Arc<dyn PlatformScripting>,
    ) -> Self {
        let policy = Policy::new(
            config.senders.clone(),
            config.trigger_tag.clone(),
            std::time::Duration::from_secs(config.rate_limit.window_secs),
            config.rate_limit.max_messages,
        );
        let proactive_rate_limiter = RateLimiter::new(std::time::Duration::from_secs(3600), config.proactive.max_proactive_per_hour);
        Self {
            approvals: Arc::new(ApprovalManager::new(Arc::clone(&store))),
            store,
            policy: Arc::new(policy),
            connector,
            egress: Arc::new(egress),
            events,
            proactive_rate_limiter: Arc::new(proactive_rate_limiter),
            sender_locks: Arc::new(DashMap::new()),
            scripting,
            config,
        }
    }

    /// Acquire the ordering lock for `(channel, sender)`, creating it on
    /// first use. Held by the caller for the duration of one dispatch.
    pub async fn lock_sender(&self, channel: Channel, sender: &Sender) -> tokio::sync::OwnedMutexGuard<()> {
        let key = (channel, sender.clone());
        let lock = self
            .sender_locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Whether the Companion Loop and Follow-Up Scheduler are currently
    /// muted. Read through to the store on every call; never cached.
    pub fn is_muted(&self) -> bool {
        matches!(self.store.kv_get(MUTED_KV_KEY), Ok(Some(value)) if value == "true")
    }

    /// Set the mute flag, returning the previous value.
    pub fn set_muted(&self, muted: bool) -> bool {
        let previous = self.is_muted();
        let _ = self.store.kv_put(MUTED_KV_KEY, if muted { "true" } else { "false" });
        previous
    }
}

/// A trait object alias kept here so call sites don't need to spell out
/// `Arc<dyn EgressAdapter>` when registering channel adapters.
pub type SharedEgressAdapter = Arc<dyn EgressAdapter>;
