//! The inbound router: one `InboundMessage` at a time through policy,
//! parsing, and dispatch.
//!
//! Grounded on the existing `inbound_router::run_inbound_router` /
//! `handle_inbound`: a single `tokio::select!` loop reading off a fan-in
//! `mpsc::Receiver`, spawning one task per accepted message so a slow
//! connector turn for one sender never blocks another sender's messages.
//! Same-sender ordering is restored inside the spawned task by
//! `OrchestratorCtx::lock_sender` rather than the existing per-session
//! mutex, since courier has no in-process session object to hang a lock on.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use courier_channels::InboundMessage;
use courier_connector::Connector;
use courier_core::{ApprovalId, Channel, DropReason, RunId, Sender};
use courier_events::{CourierEvent, EventMetadata};
use courier_parser::{Command, DenyTarget, ParsedCommand};
use courier_storage::{MessageDirection, RunKind, RunState, RunStateUpdate};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::ctx::OrchestratorCtx;
use crate::{context_builder, preview, run_turn};

/// Drives the router loop until `inbound_rx` closes (daemon shutdown).
pub async fn run(
    ctx: OrchestratorCtx,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("inbound router shutting down");
                    break;
                }
            }
            message = inbound_rx.recv() => {
                match message {
                    Some(message) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            handle_inbound(&ctx, message).await;
                        });
                    }
                    None => {
                        info!("inbound channel closed, router exiting");
                        break;
                    }
                }
            }
        }
    }
}

fn run_kind_for(command: &Command) -> Option<RunKind> {
    match command {
        Command::Chat { .. } => Some(RunKind::Chat),
        Command::Idea => Some(RunKind::Idea),
        Command::Plan => Some(RunKind::Plan),
        Command::Task => Some(RunKind::Task),
        Command::Project => Some(RunKind::Project),
        _ => None,
    }
}

fn requires_approval(kind: RunKind, command: &Command) -> bool {
    kind.always_mutates() || matches!(command, Command::Chat { possibly_mutating: true })
}

fn thread_hint_of(message: &InboundMessage) -> Option<String> {
    message.context_metadata.get("thread_hint").and_then(|v| v.as_str()).map(str::to_string)
}

/// Route one inbound message from ingest through to either a synchronous
/// control-command reply or a dispatched (possibly approval-gated) run.
pub async fn handle_inbound(ctx: &OrchestratorCtx, message: InboundMessage) {
    let now = Utc::now();

    let recorded = match ctx.store.record_message(
        message.channel,
        &message.sender,
        MessageDirection::Inbound,
        Some(&message.id),
        &message.text,
        message.received_at,
    ) {
        Ok(recorded) => recorded,
        Err(err) => {
            warn!(%err, "failed to record inbound message");
            return;
        }
    };
    if recorded.is_none() {
        // Already recorded for this channel; dedupe by external id.
        return;
    }

    let input = courier_policy::PolicyInput {
        channel: message.channel,
        raw_sender: message.sender.as_str(),
        is_self: message.is_self,
        text: &message.text,
    };
    let verdict = ctx.policy.evaluate(&input, std::time::Instant::now());

    let (sender, effective_text) = match verdict {
        courier_policy::PolicyVerdict::Accept { sender, effective_text } => (sender, effective_text),
        courier_policy::PolicyVerdict::Drop { sender, reason } => {
            drop_message(ctx, message.channel, sender, reason, now);
            return;
        }
    };

    let parsed = courier_parser::classify(&effective_text);
    let thread_hint = thread_hint_of(&message);

    if let Some(kind) = run_kind_for(&parsed.command) {
        dispatch_work(ctx, message.channel, sender, thread_hint, kind, parsed, now).await;
        return;
    }

    dispatch_control(ctx, message.channel, &sender, thread_hint.as_deref(), parsed.command, now).await;
}

fn drop_message(ctx: &OrchestratorCtx, channel: Channel, sender: Option<Sender>, reason: DropReason, now: DateTime<Utc>) {
    info!(?reason, "inbound message dropped by policy");
    ctx.events.publish(CourierEvent::MessageIgnored {
        metadata: EventMetadata::new("orchestrator", now),
        channel,
        sender: sender.clone(),
        reason: reason.as_str(),
    });
    let _ = ctx.store.append_event(
        "message_ignored",
        json!({ "channel": channel.as_str(), "sender": sender.map(|s| s.as_str().to_string()), "reason": reason.as_str() }),
        now,
    );
}

async fn dispatch_work(
    ctx: &OrchestratorCtx,
    channel: Channel,
    sender: Sender,
    thread_hint: Option<String>,
    kind: RunKind,
    parsed: ParsedCommand,
    now: DateTime<Utc>,
) {
    let run_id = RunId::new();
    let needs_approval = requires_approval(kind, &parsed.command);
    let summary = summarize(&parsed.body);
    let preview_text = preview::encode(parsed.workspace_alias.as_deref(), thread_hint.as_deref(), &parsed.body);

    if let Err(err) = ctx.store.create_run(run_id, &sender, channel, kind, &summary, &preview_text, now) {
        warn!(%err, "failed to create run");
        return;
    }
    ctx.events.publish(CourierEvent::MessageIngested {
        metadata: EventMetadata::new("orchestrator", now),
        channel,
        sender: sender.clone(),
        run_id,
    });

    if needs_approval {
        match ctx.approvals.create(
            run_id,
            &sender,
            &summary,
            &preview_text,
            now,
            ChronoDuration::seconds(ctx.config.approval.ttl_secs as i64),
        ) {
            Ok(approval_id) => {
                let _ = ctx
                    .store
                    .update_run_state(run_id, RunState::AwaitingApproval, RunStateUpdate::default());
                ctx.events.publish(CourierEvent::ApprovalCreated {
                    metadata: EventMetadata::new("orchestrator", now),
                    approval_id: approval_id.to_string(),
                    sender: sender.clone(),
                });
                run_turn::reply(
                    ctx,
                    channel,
                    &sender,
                    thread_hint.as_deref(),
                    &format!("{summary}\n\napprove {approval_id} or deny {approval_id}?"),
                )
                .await;
            }
            Err(err) => warn!(%err, "failed to create approval"),
        }
        return;
    }

    let ctx_owned = ctx.clone();
    tokio::spawn(async move {
        run_turn::execute(ctx_owned, run_id, channel, sender, kind).await;
    });
}

fn summarize(body: &str) -> String {
    courier_core::util::truncate_to_boundary(body, 160).to_string()
}

async fn dispatch_control(
    ctx: &OrchestratorCtx,
    channel: Channel,
    sender: &Sender,
    thread_hint: Option<&str>,
    command: Command,
    now: DateTime<Utc>,
) {
    match command {
        Command::Approve { id, .. } => handle_approve(ctx, channel, sender, thread_hint, &id, now).await,
        Command::Deny(target) => handle_deny(ctx, channel, sender, thread_hint, target, now).await,
        Command::Status => {
            let pending = ctx.approvals.pending_for_sender(sender).map(|v| v.len()).unwrap_or(0);
            run_turn::reply(ctx, channel, sender, thread_hint, &format!("{pending} pending approval(s).")).await;
        }
        Command::Health => {
            run_turn::reply(ctx, channel, sender, thread_hint, "healthy.").await;
        }
        Command::History { query } => {
            let pattern = courier_core::util::escape_like_pattern(query.as_deref().unwrap_or(""));
            match ctx.store.search_messages(sender, &pattern) {
                Ok(messages) => {
                    let text = if messages.is_empty() {
                        "no matching history.".to_string()
                    } else {
                        messages.iter().take(10).map(|m| m.text.clone()).collect::<Vec<_>>().join("\n---\n")
                    };
                    run_turn::reply(ctx, channel, sender, thread_hint, &text).await;
                }
                Err(err) => warn!(%err, "history search failed"),
            }
        }
        Command::Usage => {
            run_turn::reply(ctx, channel, sender, thread_hint, "usage details are available from the admin API.").await;
        }
        Command::Logs => match ctx.store.recent_events(10) {
            Ok(events) => {
                let text = events.iter().map(|e| e.kind.clone()).collect::<Vec<_>>().join(", ");
                run_turn::reply(ctx, channel, sender, thread_hint, &format!("recent events: {text}")).await;
            }
            Err(err) => warn!(%err, "failed to read recent events"),
        },
        Command::System { subcommand } => handle_system(ctx, channel, sender, thread_hint, &subcommand).await,
        Command::ClearContext => {
            if context_builder::clear_context(ctx.store.as_ref(), channel, sender, now).is_ok() {
                run_turn::reply(ctx, channel, sender, thread_hint, "context cleared.").await;
            }
        }
        Command::Help => {
            run_turn::reply(
                ctx,
                channel,
                sender,
                thread_hint,
                "chat freely, or prefix with idea:/plan:/task:/project:. approve <id> / deny <id> resolve a pending approval. status, health, history, usage, logs, system:<cmd>, clear context.",
            )
            .await;
        }
        Command::Chat { .. } | Command::Idea | Command::Plan | Command::Task | Command::Project => {
            unreachable!("work commands are routed through dispatch_work")
        }
    }
}

async fn handle_approve(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, id: &str, now: DateTime<Utc>) {
    let approval_id = ApprovalId::from_str_lossy(id);
    match ctx.approvals.resolve(&approval_id, sender, true, now) {
        Ok(result) => {
            ctx.events.publish(CourierEvent::ApprovalResolved {
                metadata: EventMetadata::new("orchestrator", now),
                approval_id: approval_id.to_string(),
                resolution: "approved".to_string(),
            });
            let run = result.run;
            let ctx_owned = ctx.clone();
            tokio::spawn(async move {
                run_turn::execute(ctx_owned, run.run_id, run.channel, run.sender, run.kind).await;
            });
        }
        Err(err) => {
            run_turn::reply(ctx, channel, sender, thread_hint, &format!("couldn't approve that: {err}")).await;
        }
    }
}

async fn handle_deny(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, target: DenyTarget, now: DateTime<Utc>) {
    let ids = match target {
        DenyTarget::Id(id) => vec![ApprovalId::from_str_lossy(&id)],
        DenyTarget::All => match ctx.approvals.pending_for_sender(sender) {
            Ok(pending) => pending.into_iter().map(|a| a.request_id).collect(),
            Err(err) => {
                warn!(%err, "failed to list pending approvals");
                Vec::new()
            }
        },
    };

    let mut denied = 0usize;
    for id in ids {
        if ctx.approvals.resolve(&id, sender, false, now).is_ok() {
            denied += 1;
            ctx.events.publish(CourierEvent::ApprovalResolved {
                metadata: EventMetadata::new("orchestrator", now),
                approval_id: id.to_string(),
                resolution: "denied".to_string(),
            });
        }
    }
    run_turn::reply(ctx, channel, sender, thread_hint, &format!("{denied} approval(s) denied.")).await;
}

async fn handle_system(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, subcommand: &str) {
    let lowered = subcommand.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "mute" => {
            ctx.set_muted(true);
            run_turn::reply(ctx, channel, sender, thread_hint, "proactive messages muted.").await;
        }
        "unmute" => {
            ctx.set_muted(false);
            run_turn::reply(ctx, channel, sender, thread_hint, "proactive messages unmuted.").await;
        }
        "killswitch" => {
            ctx.connector.cancel_all();
            run_turn::reply(ctx, channel, sender, thread_hint, "killswitch engaged: every in-flight run is being terminated.").await;
        }
        other => {
            if let Some(id_text) = other.strip_prefix("cancel run ") {
                handle_cancel_run(ctx, channel, sender, thread_hint, id_text.trim()).await;
            } else {
                run_turn::reply(ctx, channel, sender, thread_hint, &format!("unknown system command: {other}")).await;
            }
        }
    }
}

/// `system: cancel run <id>`. Cancelling the connector subprocess is enough
/// to mark the run: a cancelled turn makes `execute_inner` observe
/// `ConnectorError::Cancelled` and transition the run to `RunState::Cancelled`
/// itself, the same path a timeout or a killswitch-wide cancel takes.
async fn handle_cancel_run(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, id_text: &str) {
    match id_text.parse::<RunId>() {
        Ok(run_id) => {
            if ctx.connector.cancel(run_id) {
                run_turn::reply(ctx, channel, sender, thread_hint, &format!("cancelling run {run_id}.")).await;
            } else {
                run_turn::reply(ctx, channel, sender, thread_hint, &format!("run {run_id} is not currently executing.")).await;
            }
        }
        Err(_) => {
            run_turn::reply(ctx, channel, sender, thread_hint, &format!("not a run id: {id_text}")).await;
        }
    }
}
