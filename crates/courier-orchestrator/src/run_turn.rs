//! Executes one connector turn end to end: prompt assembly, the connector
//! call itself, checkpoint/resume bookkeeping, verification for mutating
//! kinds, and the reply back onto the originating channel.

use chrono::{Duration as ChronoDuration, Utc};
use courier_connector::{ConnectorError, TurnRequest};
use courier_core::{Channel, RunId, Sender};
use courier_events::{CourierEvent, EventMetadata};
use courier_storage::{MessageDirection, RunKind, RunState, RunStateUpdate};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::ctx::OrchestratorCtx;
use crate::{context_builder, preview, workspace};

/// Spawn-friendly entry point: acquires the per-`(channel, sender)` lock
/// before doing any work, so concurrent messages from the same sender are
/// serialized while different senders run fully in parallel.
pub async fn execute(ctx: OrchestratorCtx, run_id: RunId, channel: Channel, sender: Sender, kind: RunKind) {
    let _lock = ctx.lock_sender(channel, &sender).await;
    if let Err(err) = execute_inner(&ctx, run_id, channel, &sender, kind).await {
        error!(%run_id, %err, "run execution failed");
    }
}

fn transition(ctx: &OrchestratorCtx, run_id: RunId, state: RunState) {
    let now = Utc::now();
    ctx.events.publish(CourierEvent::RunStateChanged {
        metadata: EventMetadata::new("orchestrator", now),
        run_id,
        state: format!("{state:?}").to_uppercase(),
    });
    let _ = ctx.store.append_event(
        "run_state_changed",
        json!({ "run_id": run_id.to_string(), "state": format!("{state:?}") }),
        now,
    );
}

async fn execute_inner(
    ctx: &OrchestratorCtx,
    run_id: RunId,
    channel: Channel,
    sender: &Sender,
    kind: RunKind,
) -> Result<(), courier_storage::StoreError> {
    let run = ctx.store.get_run(run_id)?;
    let (alias, thread_hint, body) = preview::decode(&run.command_preview);

    let (alias_used, workspace_path) = match workspace::resolve(&ctx.config.workspace, alias.as_deref()) {
        Ok(resolved) => resolved,
        Err(reason) => {
            warn!(%run_id, %reason, "could not resolve workspace for run");
            ctx.store.update_run_state(
                run_id,
                RunState::Failed,
                RunStateUpdate {
                    result: Some(reason.clone()),
                    ..Default::default()
                },
            )?;
            transition(ctx, run_id, RunState::Failed);
            reply_for_run(ctx, Some(run_id), channel, sender, thread_hint.as_deref(), &format!("could not start: {reason}")).await;
            return Ok(());
        }
    };

    ctx.store.update_run_state(
        run_id,
        RunState::Executing,
        RunStateUpdate {
            attempts_delta: 1,
            ..Default::default()
        },
    )?;
    transition(ctx, run_id, RunState::Executing);

    let topic_memory = context_builder::load_ambient_summary(ctx.store.as_ref())?;
    let prompt = context_builder::build_prompt(
        &ctx.store,
        channel,
        sender,
        &ctx.config.memory,
        topic_memory.as_deref(),
        &workspace_path,
        &alias_used,
        run.checkpoint_context.as_deref(),
        body,
    )?;

    let request = TurnRequest {
        run_id,
        prompt: &prompt,
        workspace: &workspace_path,
        timeout: Duration::from_secs(ctx.config.timeouts.connector_turn_secs),
    };

    match ctx.connector.run_turn(request).await {
        Ok(text) => complete(ctx, run_id, channel, sender, thread_hint.as_deref(), kind, text).await,
        Err(ConnectorError::Timeout { partial_output }) => {
            handle_timeout(ctx, run_id, channel, sender, thread_hint.as_deref(), run.attempts + 1, partial_output).await
        }
        Err(ConnectorError::Cancelled { partial_output }) => {
            info!(%run_id, "run cancelled");
            ctx.store.update_run_state(
                run_id,
                RunState::Cancelled,
                RunStateUpdate {
                    result: Some(partial_output),
                    ..Default::default()
                },
            )?;
            transition(ctx, run_id, RunState::Cancelled);
        }
        Err(err) => {
            warn!(%run_id, %err, "connector turn failed");
            ctx.store.update_run_state(
                run_id,
                RunState::Failed,
                RunStateUpdate {
                    result: Some(err.to_string()),
                    ..Default::default()
                },
            )?;
            transition(ctx, run_id, RunState::Failed);
            reply_for_run(ctx, Some(run_id), channel, sender, thread_hint.as_deref(), &format!("that run failed: {err}")).await;
        }
    }
    Ok(())
}

async fn complete(
    ctx: &OrchestratorCtx,
    run_id: RunId,
    channel: Channel,
    sender: &Sender,
    thread_hint: Option<&str>,
    kind: RunKind,
    text: String,
) {
    if kind.is_verifiable() {
        ctx.store
            .update_run_state(run_id, RunState::Verifying, RunStateUpdate::default())
            .ok();
        transition(ctx, run_id, RunState::Verifying);
        // No separate verifier agent is modeled; a Task/Project turn that
        // returned successfully is taken as self-verified, same as the
        // connector's own exit status already signaled.
    }

    let _ = ctx.store.update_run_state(
        run_id,
        RunState::Completed,
        RunStateUpdate {
            result: Some(text.clone()),
            ..Default::default()
        },
    );
    transition(ctx, run_id, RunState::Completed);
    reply_for_run(ctx, Some(run_id), channel, sender, thread_hint, &text).await;

    if kind.always_mutates() && ctx.config.proactive.follow_up_enabled {
        schedule_follow_up(ctx, run_id, channel, sender);
    }
}

/// Schedule a single time-triggered nudge after a mutating run completes, so
/// the Follow-Up Scheduler can check in on how it went.
fn schedule_follow_up(ctx: &OrchestratorCtx, run_id: RunId, channel: Channel, sender: &Sender) {
    let fire_at = Utc::now() + ChronoDuration::seconds(ctx.config.proactive.follow_up_delay_secs as i64);
    if let Err(err) = ctx.store.schedule_action(
        courier_core::ScheduledActionId::new(),
        Some(run_id),
        sender,
        channel,
        fire_at,
        courier_storage::ScheduledActionKind::FollowUp,
        ctx.config.proactive.max_nudges,
        "checking in on the task you approved earlier, how did it go?",
    ) {
        warn!(%run_id, %err, "failed to schedule a post-completion follow-up");
    }
}

async fn handle_timeout(
    ctx: &OrchestratorCtx,
    run_id: RunId,
    channel: Channel,
    sender: &Sender,
    thread_hint: Option<&str>,
    attempts_so_far: u32,
    partial_output: String,
) {
    let can_resume = ctx.config.connector.checkpoint_on_timeout
        && attempts_so_far < ctx.config.connector.max_resume_attempts;

    if can_resume {
        warn!(%run_id, attempts_so_far, "run timed out, checkpointing for resume");
        let _ = ctx.store.update_run_state(
            run_id,
            RunState::Checkpointed,
            RunStateUpdate {
                checkpoint_context: Some(partial_output),
                ..Default::default()
            },
        );
        transition(ctx, run_id, RunState::Checkpointed);
        let now = Utc::now();
        let _ = ctx.store.schedule_action(
            courier_core::ScheduledActionId::new(),
            Some(run_id),
            sender,
            channel,
            now,
            courier_storage::ScheduledActionKind::FollowUp,
            1,
            RESUME_CHECKPOINT_PAYLOAD,
        );
    } else {
        warn!(%run_id, attempts_so_far, "run timed out and will not be resumed");
        let _ = ctx.store.update_run_state(
            run_id,
            RunState::Failed,
            RunStateUpdate {
                result: Some("timed out".to_string()),
                ..Default::default()
            },
        );
        transition(ctx, run_id, RunState::Failed);
        reply_for_run(ctx, Some(run_id), channel, sender, thread_hint, "that took too long and I had to give up.").await;
    }
}

/// Sentinel payload marking a follow-up action as a checkpoint resume
/// rather than a post-completion nudge, so the scheduler can tell the two
/// apart without a dedicated `ScheduledActionKind`.
pub(crate) const RESUME_CHECKPOINT_PAYLOAD: &str = "resume-checkpointed-run";

const REPLY_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Deliver `text` back onto `channel`, recording it as an outbound message.
/// Equivalent to `reply_for_run(ctx, None, ...)` for call sites with no run
/// to mark on delivery failure (the router's own system-command replies, the
/// scheduler's bare nudges).
pub async fn reply(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, text: &str) {
    reply_for_run(ctx, None, channel, sender, thread_hint, text).await;
}

/// Same as `reply`, but when `run_id` is given and delivery fails even after
/// one retry, the run is marked `FAILED_DELIVERY` rather than left in
/// whatever state `execute_inner`/`complete` left it in, e.g. `Completed`
/// with no record that the reply never reached the sender.
///
/// `Channel::Http` has no egress adapter by design: its replies are read
/// back through the admin API, never pushed, so there is nothing to retry.
pub async fn reply_for_run(
    ctx: &OrchestratorCtx,
    run_id: Option<RunId>,
    channel: Channel,
    sender: &Sender,
    thread_hint: Option<&str>,
    text: &str,
) {
    if channel == Channel::Http {
        let _ = ctx
            .store
            .record_message(channel, sender, MessageDirection::Outbound, None, text, Utc::now());
        return;
    }

    if deliver(ctx, channel, sender, thread_hint, text).await {
        return;
    }

    warn!(%channel, "reply delivery failed, retrying once");
    tokio::time::sleep(REPLY_RETRY_DELAY).await;

    if deliver(ctx, channel, sender, thread_hint, text).await {
        return;
    }

    error!(%channel, "reply delivery failed after retry, giving up");
    if let Some(run_id) = run_id {
        let _ = ctx
            .store
            .update_run_state(run_id, RunState::FailedDelivery, RunStateUpdate::default());
        transition(ctx, run_id, RunState::FailedDelivery);
    }
}

async fn deliver(ctx: &OrchestratorCtx, channel: Channel, sender: &Sender, thread_hint: Option<&str>, text: &str) -> bool {
    match ctx.egress.send(channel, sender, text, thread_hint).await {
        Ok(_status) => {
            let now = Utc::now();
            let _ = ctx.store.record_message(channel, sender, MessageDirection::Outbound, None, text, now);
            ctx.events.publish(CourierEvent::OutboundSent {
                metadata: EventMetadata::new("orchestrator", now),
                channel,
                recipient: sender.clone(),
            });
            true
        }
        Err(err) => {
            error!(%channel, %err, "failed to deliver reply");
            false
        }
    }
}
