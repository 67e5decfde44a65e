//! The Ambient Scanner: passively summarizes recent
//! activity into a short topic-memory snippet every turn's prompt can draw
//! on, without ever dispatching a run or sending outbound.
//!
//! `Store::search_messages` only enumerates a single sender's history, so
//! there is no cross-sender query to build a genuinely per-topic digest
//! from message content. This scanner is scoped to what the audit event
//! log already aggregates across every channel and sender: a coarse
//! activity count, not a content summary. A richer scanner would need a
//! `Store` query surface this one deliberately did not add (see DESIGN.md).

use chrono::Utc;
use tracing::{info, warn};

use crate::context_builder;
use crate::ctx::OrchestratorCtx;

/// Run the ambient scanner loop until `shutdown_rx` fires.
pub async fn run(ctx: OrchestratorCtx, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(ctx.config.proactive.ambient_interval_secs));
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("ambient scanner shutting down");
                    break;
                }
            }
            _ = interval.tick() => {
                if let Err(err) = tick(&ctx) {
                    warn!(%err, "ambient scanner tick failed");
                }
            }
        }
    }
}

fn tick(ctx: &OrchestratorCtx) -> Result<(), courier_storage::StoreError> {
    let events = ctx.store.recent_events(100)?;
    let mut by_kind: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for event in &events {
        *by_kind.entry(event.kind.clone()).or_insert(0) += 1;
    }

    if by_kind.is_empty() {
        return Ok(());
    }

    let summary = by_kind
        .iter()
        .map(|(kind, count)| format!("{kind} x{count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let stamped = format!("Recent activity as of {}: {summary}", Utc::now().to_rfc3339());

    context_builder::store_ambient_summary(ctx.store.as_ref(), &stamped)
}
