//! The Companion Loop: periodic housekeeping, proactive observation, and
//! the daily digest / weekly review, independent of any inbound message.
//!
//! Digest and weekly review content is written as plain markdown under
//! `proactive.office_daily_dir`, not delivered through any egress adapter —
//! there is no single sender to address it to, and a file the user can
//! open on their own schedule fits the "ambient, non-intrusive" framing
//! better than a proactive chat message would.
//!
//! Proactive observation is the loop's one notification surface: stale
//! approvals, upcoming calendar events, overdue reminders, and untouched
//! office-inbox notes are gathered directly through the platform scripting
//! bridge, synthesized into a single brief by the connector, and delivered
//! as one consolidated chat message rather than as separate notifications
//! per source.

use chrono::{Datelike, Utc};
use courier_connector::TurnRequest;
use courier_core::{Channel, RunId, Sender};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::ctx::OrchestratorCtx;
use crate::error::SchedulerError;
use crate::{run_turn, workspace};

const DIGEST_DATE_KV_KEY: &str = "proactive.last_digest_date";
const REVIEW_WEEK_KV_KEY: &str = "proactive.last_review_week";

/// A synthetic sender the proactive rate limiter tracks companion sends
/// under, distinct from any real inbound sender identity.
fn companion_sender() -> Sender {
    Sender::normalize("courier-companion")
}

/// Run the companion loop until `shutdown_rx` fires.
pub async fn run(ctx: OrchestratorCtx, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(ctx.config.proactive.companion_interval_secs));
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("companion loop shutting down");
                    break;
                }
            }
            _ = interval.tick() => {
                if let Err(err) = tick(&ctx).await {
                    warn!(%err, "companion loop tick failed");
                }
            }
        }
    }
}

async fn tick(ctx: &OrchestratorCtx) -> Result<(), SchedulerError> {
    let now = Utc::now();

    let expired = ctx.approvals.expire_due(now)?;
    if !expired.is_empty() {
        info!(count = expired.len(), "approvals expired this tick");
    }

    if ctx.config.quiet_hours.contains_hour(now.hour_local()) {
        return Ok(());
    }
    if ctx.is_muted() {
        return Ok(());
    }
    if !ctx.proactive_rate_limiter.record_and_check(&companion_sender(), std::time::Instant::now()) {
        return Ok(());
    }

    maybe_send_proactive_observation(ctx, now).await;
    maybe_write_daily_digest(ctx, now).await?;
    maybe_write_weekly_review(ctx, now).await?;
    Ok(())
}

/// Gather stale approvals, upcoming calendar events, overdue reminders, and
/// untouched office-inbox notes, and if there is anything worth mentioning,
/// have the connector synthesize it into one brief and send it as a single
/// chat message. Skips entirely if there is no allowed sender to address it
/// to, no default workspace to run the connector in, or nothing to report.
async fn maybe_send_proactive_observation(ctx: &OrchestratorCtx, now: chrono::DateTime<Utc>) {
    if !ctx.config.channels.chat_enabled {
        return;
    }
    let Some(sender_text) = ctx.config.senders.allowed.first() else {
        return;
    };

    let mut observations = Vec::new();

    match ctx.store.list_pending_approvals(100) {
        Ok(approvals) => {
            let stale_minutes = i64::from(ctx.config.proactive.stale_approval_minutes);
            for approval in approvals {
                if (now - approval.created_at).num_minutes() >= stale_minutes {
                    observations.push(format!(
                        "- approval {} has been waiting since {}: {}",
                        approval.request_id,
                        approval.created_at.to_rfc3339(),
                        approval.summary
                    ));
                }
            }
        }
        Err(err) => warn!(%err, "could not list pending approvals for proactive observation"),
    }

    if ctx.config.channels.calendar_enabled {
        match ctx.scripting.list_calendar_events(ctx.config.channels.calendar_lookahead_minutes).await {
            Ok(events) => {
                for event in events {
                    observations.push(format!("- upcoming: \"{}\" at {}", event.title, event.start_at.to_rfc3339()));
                }
            }
            Err(err) => warn!(%err, "could not list calendar events for proactive observation"),
        }
    }

    if ctx.config.channels.reminders_enabled {
        match ctx.scripting.list_incomplete_reminders(&ctx.config.channels.reminders_list).await {
            Ok(reminders) => {
                for reminder in reminders {
                    observations.push(format!("- overdue reminder: \"{}\"", reminder.title));
                }
            }
            Err(err) => warn!(%err, "could not list reminders for proactive observation"),
        }
    }

    if ctx.config.channels.notes_enabled {
        match ctx
            .scripting
            .list_notes(&ctx.config.channels.notes_folder, &ctx.config.trigger_tag)
            .await
        {
            Ok(notes) => {
                for note in notes {
                    observations.push(format!("- untouched note: \"{}\"", note.title));
                }
            }
            Err(err) => warn!(%err, "could not list notes for proactive observation"),
        }
    }

    if observations.is_empty() {
        return;
    }

    let Ok((_alias, workspace_path)) = workspace::resolve(&ctx.config.workspace, None) else {
        warn!("no default workspace configured; skipping proactive observation brief");
        return;
    };

    let prompt = format!(
        "Summarize the following observations into one short, friendly check-in \
         message. Be concise, mention what needs attention, and skip anything \
         that doesn't.\n\n{}",
        observations.join("\n")
    );
    let request = TurnRequest {
        run_id: RunId::new(),
        prompt: &prompt,
        workspace: &workspace_path,
        timeout: std::time::Duration::from_secs(ctx.config.timeouts.connector_turn_secs),
    };

    match ctx.connector.run_turn(request).await {
        Ok(brief) => {
            let sender = Sender::normalize(sender_text);
            run_turn::reply(ctx, Channel::Chat, &sender, None, &brief).await;
        }
        Err(err) => warn!(%err, "failed to synthesize proactive observation brief"),
    }
}

async fn maybe_write_daily_digest(ctx: &OrchestratorCtx, now: chrono::DateTime<Utc>) -> Result<(), SchedulerError> {
    if now.hour_local() < ctx.config.proactive.daily_digest_hour {
        return Ok(());
    }
    let today = now.date_naive().to_string();
    if ctx.store.kv_get(DIGEST_DATE_KV_KEY)?.as_deref() == Some(today.as_str()) {
        return Ok(());
    }

    let events = ctx.store.recent_events(200)?;
    let mut by_kind: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for event in &events {
        *by_kind.entry(event.kind.clone()).or_insert(0) += 1;
    }

    let mut body = format!("# Daily digest — {today}\n\n");
    if by_kind.is_empty() {
        body.push_str("Nothing happened today.\n");
    } else {
        for (kind, count) in &by_kind {
            body.push_str(&format!("- {kind}: {count}\n"));
        }
    }

    write_office_file(ctx, &format!("{today}.md"), &body).await?;
    ctx.store.kv_put(DIGEST_DATE_KV_KEY, &today)?;
    Ok(())
}

/// Write a rollup once per ISO week, the same way `maybe_write_daily_digest`
/// writes one per day — keyed on the ISO year/week rather than the date so
/// it fires exactly once regardless of which day the companion loop happens
/// to be ticking on when the week turns over.
async fn maybe_write_weekly_review(ctx: &OrchestratorCtx, now: chrono::DateTime<Utc>) -> Result<(), SchedulerError> {
    if now.hour_local() < ctx.config.proactive.daily_digest_hour {
        return Ok(());
    }
    let local_date = now.with_timezone(&chrono::Local).date_naive();
    if local_date.weekday() != chrono::Weekday::Sun {
        return Ok(());
    }
    let iso = local_date.iso_week();
    let week_key = format!("{}-W{:02}", iso.year(), iso.week());
    if ctx.store.kv_get(REVIEW_WEEK_KV_KEY)?.as_deref() == Some(week_key.as_str()) {
        return Ok(());
    }

    let events = ctx.store.recent_events(1000)?;
    let mut by_kind: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for event in &events {
        *by_kind.entry(event.kind.clone()).or_insert(0) += 1;
    }

    let mut body = format!("# Weekly review — {week_key}\n\n");
    if by_kind.is_empty() {
        body.push_str("Nothing happened this week.\n");
    } else {
        for (kind, count) in &by_kind {
            body.push_str(&format!("- {kind}: {count}\n"));
        }
    }

    write_office_file(ctx, &format!("review-{week_key}.md"), &body).await?;
    ctx.store.kv_put(REVIEW_WEEK_KV_KEY, &week_key)?;
    Ok(())
}

async fn write_office_file(ctx: &OrchestratorCtx, filename: &str, body: &str) -> Result<(), SchedulerError> {
    let dir = shellexpand_home(&ctx.config.proactive.office_daily_dir);
    if let Err(err) = tokio::fs::create_dir_all(&dir).await {
        warn!(%err, path = %dir.display(), "could not create office daily directory");
        return Ok(());
    }
    let path = dir.join(filename);
    match tokio::fs::File::create(&path).await {
        Ok(mut file) => {
            if let Err(err) = file.write_all(body.as_bytes()).await {
                warn!(%err, path = %path.display(), "could not write digest file");
            }
        }
        Err(err) => warn!(%err, path = %path.display(), "could not create digest file"),
    }
    Ok(())
}

fn shellexpand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::UserDirs::new() {
            return home.home_dir().join(rest);
        }
    }
    std::path::PathBuf::from(path)
}

trait HourLocal {
    fn hour_local(&self) -> u32;
}

impl HourLocal for chrono::DateTime<Utc> {
    fn hour_local(&self) -> u32 {
        use chrono::Timelike;
        self.with_timezone(&chrono::Local).hour()
    }
}
