//! The Follow-Up Scheduler: polls for due scheduled actions and resumes
//! checkpointed runs, nudges a sender about a completed run, or delivers a
//! bare reminder, repeating every fired action until its nudge budget
//! (`max_nudges`) is exhausted.

use chrono::{Duration as ChronoDuration, Utc};
use courier_storage::{RunState, ScheduledAction, ScheduledActionKind};
use tracing::{info, warn};

use crate::ctx::OrchestratorCtx;
use crate::run_turn::{self, RESUME_CHECKPOINT_PAYLOAD};

const BATCH_LIMIT: usize = 50;

/// Run the scheduler loop until `shutdown_rx` fires.
pub async fn run(ctx: OrchestratorCtx, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(ctx.config.proactive.scheduler_interval_secs));
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("follow-up scheduler shutting down");
                    break;
                }
            }
            _ = interval.tick() => {
                if let Err(err) = tick(&ctx).await {
                    warn!(%err, "follow-up scheduler tick failed");
                }
            }
        }
    }
}

async fn tick(ctx: &OrchestratorCtx) -> Result<(), courier_storage::StoreError> {
    let now = Utc::now();
    let due = ctx.store.due_actions(now, BATCH_LIMIT)?;
    for action in due {
        fire(ctx, action, now).await;
    }
    Ok(())
}

async fn fire(ctx: &OrchestratorCtx, action: ScheduledAction, now: chrono::DateTime<Utc>) {
    match action.kind {
        ScheduledActionKind::FollowUp => fire_follow_up(ctx, &action, now).await,
        ScheduledActionKind::Digest | ScheduledActionKind::Review => {
            // Produced and consumed entirely by the companion loop; not
            // expected to reach the scheduler, but drained harmlessly.
            info!(action_id = %action.id, "dropping a digest/review action with no scheduler handler");
        }
    }
    if ctx.store.mark_action_fired(&action.id, true).is_err() {
        warn!(action_id = %action.id, "failed to mark scheduled action as fired");
    }

    let nudges_sent = action.nudges_sent + 1;
    if nudges_sent >= action.max_nudges {
        if let Err(err) = ctx.store.remove_action(&action.id) {
            warn!(action_id = %action.id, %err, "failed to remove fired scheduled action");
        }
    } else {
        let next_fire_at = now + ChronoDuration::seconds(ctx.config.proactive.follow_up_delay_secs as i64);
        if let Err(err) = ctx.store.reschedule_action(&action.id, next_fire_at) {
            warn!(action_id = %action.id, %err, "failed to reschedule scheduled action");
        }
    }
}

async fn fire_follow_up(ctx: &OrchestratorCtx, action: &ScheduledAction, _now: chrono::DateTime<Utc>) {
    let Some(run_id) = action.run_id else {
        // A bare nudge with no run to resume: notify the sender directly.
        run_turn::reply(ctx, action.channel, &action.sender, None, &action.payload).await;
        return;
    };

    if action.payload != RESUME_CHECKPOINT_PAYLOAD {
        // A post-completion check-in on a run that already finished, not a
        // checkpoint to resume.
        run_turn::reply_for_run(ctx, Some(run_id), action.channel, &action.sender, None, &action.payload).await;
        return;
    }

    let run = match ctx.store.get_run(run_id) {
        Ok(run) => run,
        Err(err) => {
            warn!(%run_id, %err, "could not load run for scheduled follow-up");
            return;
        }
    };

    if run.state != RunState::Checkpointed {
        // Resolved some other way (cancelled, denied) since the checkpoint
        // was scheduled; nothing left to resume.
        return;
    }

    info!(%run_id, "resuming checkpointed run from the follow-up scheduler");
    let ctx_owned = ctx.clone();
    tokio::spawn(async move {
        run_turn::execute(ctx_owned, run.run_id, run.channel, run.sender, run.kind).await;
    });
}
