//! `rusqlite`-backed implementation of [`crate::Store`].
//!
//! A single write connection lives behind an `Arc<Mutex<Connection>>`,
//! serializing writes; each calling thread additionally gets its own
//! read-only connection
//! opened against the same file in WAL mode, cached in a `thread_local!`, so
//! reads never block behind the write mutex.

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Approval, ApprovalOutcome, ApprovalStatus, MessageDirection, Run, RunKind, RunState,
    ScheduledAction, ScheduledActionKind, Session, StoredEvent, StoredMessage,
};
use crate::migrations::MIGRATIONS;
use crate::store::{RunStateUpdate, Store};
use chrono::{DateTime, Utc};
use courier_core::{ApprovalId, Channel, RunId, ScheduledActionId, Sender};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_rfc3339(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| StoreError::NotFound(format!("malformed timestamp {s:?}: {err}")))
}

/// A SQLite-backed [`Store`].
pub struct SqliteStore {
    path: PathBuf,
    writer: Arc<Mutex<Connection>>,
}

thread_local! {
    static READ_CONN: RefCell<Option<(PathBuf, Connection)>> = const { RefCell::new(None) };
}

impl SqliteStore {
    /// Open (creating if absent) the database file at `path`, applying any
    /// pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a purely in-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            writer: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_write<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    fn with_read<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        if self.path == PathBuf::from(":memory:") {
            return self.with_write(f);
        }
        READ_CONN.with(|cell| {
            let mut slot = cell.borrow_mut();
            let needs_new = !matches!(&*slot, Some((cached_path, _)) if cached_path == &self.path);
            if needs_new {
                let conn = Connection::open(&self.path)?;
                conn.pragma_update(None, "query_only", true)?;
                *slot = Some((self.path.clone(), conn));
            }
            let (_, conn) = slot.as_ref().expect("just inserted");
            f(conn)
        })
    }
}

fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    for &(version, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|source| StoreError::Migration { version, source })?;
        tx.pragma_update(None, "user_version", version)
            .map_err(|source| StoreError::Migration { version, source })?;
        tx.commit()?;
    }
    Ok(())
}

fn build_run(
    run_id: String,
    sender: String,
    channel: String,
    kind: String,
    state: String,
    created_at: String,
    prompt_summary: String,
    command_preview: Option<String>,
    attempts: u32,
    result: Option<String>,
    checkpoint_context: Option<String>,
) -> StoreResult<Run> {
    Ok(Run {
        run_id: RunId::try_from(run_id.as_str())?,
        sender: Sender::normalize(&sender),
        channel: channel
            .parse()
            .map_err(|_| StoreError::NotFound(format!("unknown channel {channel:?}")))?,
        kind: RunKind::from_str(&kind)?,
        state: RunState::from_str(&state)?,
        created_at: parse_rfc3339(&created_at)?,
        prompt_summary,
        command_preview: command_preview.unwrap_or_default(),
        result,
        attempts,
        checkpoint_context,
    })
}

impl Store for SqliteStore {
    fn create_session(&self, channel: Channel, sender: &Sender) -> StoreResult<Session> {
        self.with_write(|conn| {
            let now = Utc::now();
            let id = courier_core::SessionId::new();
            conn.execute(
                "INSERT INTO sessions (id, channel, sender, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(channel, sender) DO NOTHING",
                params![id.to_string(), channel.as_str(), sender.as_str(), to_rfc3339(now)],
            )?;
            let row = conn.query_row(
                "SELECT id, created_at, updated_at FROM sessions WHERE channel = ?1 AND sender = ?2",
                params![channel.as_str(), sender.as_str()],
                |row| {
                    let id: String = row.get(0)?;
                    let created_at: String = row.get(1)?;
                    let updated_at: String = row.get(2)?;
                    Ok((id, created_at, updated_at))
                },
            )?;
            Ok(Session {
                id: row.0.parse().unwrap_or_else(|_| courier_core::SessionId::new()),
                channel,
                sender: sender.clone(),
                created_at: parse_rfc3339(&row.1)?,
                updated_at: parse_rfc3339(&row.2)?,
            })
        })
    }

    fn list_sessions(&self, limit: usize) -> StoreResult<Vec<Session>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel, sender, created_at, updated_at
                 FROM sessions ORDER BY updated_at DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut sessions = Vec::new();
            for row in rows {
                let (id, channel, sender, created_at, updated_at) = row?;
                sessions.push(Session {
                    id: id.parse().unwrap_or_else(|_| courier_core::SessionId::new()),
                    channel: channel
                        .parse()
                        .map_err(|_| StoreError::NotFound(format!("unknown channel {channel:?}")))?,
                    sender: Sender::normalize(&sender),
                    created_at: parse_rfc3339(&created_at)?,
                    updated_at: parse_rfc3339(&updated_at)?,
                });
            }
            Ok(sessions)
        })
    }

    fn record_message(
        &self,
        channel: Channel,
        sender: &Sender,
        direction: MessageDirection,
        external_id: Option<&str>,
        text: &str,
        recorded_at: DateTime<Utc>,
    ) -> StoreResult<Option<StoredMessage>> {
        self.with_write(|conn| {
            if let Some(external_id) = external_id {
                let exists: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM messages WHERE channel = ?1 AND external_id = ?2",
                        params![channel.as_str(), external_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_some() {
                    return Ok(None);
                }
            }
            conn.execute(
                "INSERT INTO messages (channel, sender, direction, external_id, text, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    channel.as_str(),
                    sender.as_str(),
                    direction.as_str(),
                    external_id,
                    text,
                    to_rfc3339(recorded_at),
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Some(StoredMessage {
                id,
                channel,
                sender: sender.clone(),
                direction,
                external_id: external_id.map(str::to_string),
                text: text.to_string(),
                recorded_at,
            }))
        })
    }

    fn create_run(
        &self,
        run_id: RunId,
        sender: &Sender,
        channel: Channel,
        kind: RunKind,
        prompt_summary: &str,
        command_preview: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO runs (run_id, sender, channel, kind, state, created_at, prompt_summary, command_preview, attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    run_id.to_string(),
                    sender.as_str(),
                    channel.as_str(),
                    kind.as_str(),
                    RunState::Received.as_str(),
                    to_rfc3339(created_at),
                    prompt_summary,
                    command_preview,
                ],
            )?;
            Ok(())
        })
    }

    fn update_run_state(
        &self,
        run_id: RunId,
        new_state: RunState,
        update: RunStateUpdate,
    ) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "UPDATE runs SET state = ?1,
                    result = COALESCE(?2, result),
                    checkpoint_context = COALESCE(?3, checkpoint_context),
                    attempts = attempts + ?4
                 WHERE run_id = ?5",
                params![
                    new_state.as_str(),
                    update.result,
                    update.checkpoint_context,
                    update.attempts_delta,
                    run_id.to_string(),
                ],
            )?;
            Ok(())
        })
    }

    fn get_run(&self, run_id: RunId) -> StoreResult<Run> {
        self.with_read(|conn| {
            let row = conn
                .query_row(
                    "SELECT run_id, sender, channel, kind, state, created_at, prompt_summary, command_preview, attempts, result, checkpoint_context
                     FROM runs WHERE run_id = ?1",
                    params![run_id.to_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, Option<String>>(7)?,
                            row.get::<_, u32>(8)?,
                            row.get::<_, Option<String>>(9)?,
                            row.get::<_, Option<String>>(10)?,
                        ))
                    },
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))?;
            build_run(
                row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9, row.10,
            )
        })
    }

    fn create_approval(
        &self,
        request_id: ApprovalId,
        run_id: RunId,
        sender: &Sender,
        summary: &str,
        command_preview: &str,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> StoreResult<()> {
        self.with_write(|conn| {
            let expires_at = created_at + ttl;
            conn.execute(
                "INSERT INTO approvals (request_id, run_id, sender, summary, command_preview, created_at, expires_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    request_id.to_string(),
                    run_id.to_string(),
                    sender.as_str(),
                    summary,
                    command_preview,
                    to_rfc3339(created_at),
                    to_rfc3339(expires_at),
                    ApprovalStatus::Pending.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    fn resolve_approval(
        &self,
        request_id: &ApprovalId,
        decision: bool,
    ) -> StoreResult<(Run, ApprovalOutcome)> {
        self.with_write(|conn| {
            let run_id: String = conn
                .query_row(
                    "SELECT run_id FROM approvals WHERE request_id = ?1 AND status = 'pending'",
                    params![request_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("pending approval {request_id}")))?;

            let new_status = if decision {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Denied
            };
            conn.execute(
                "UPDATE approvals SET status = ?1 WHERE request_id = ?2",
                params![new_status.as_str(), request_id.to_string()],
            )?;

            let new_run_state = if decision {
                RunState::Executing
            } else {
                RunState::Denied
            };
            conn.execute(
                "UPDATE runs SET state = ?1 WHERE run_id = ?2",
                params![new_run_state.as_str(), run_id],
            )?;

            let row = conn.query_row(
                "SELECT run_id, sender, channel, kind, state, created_at, prompt_summary, command_preview, attempts, result, checkpoint_context
                 FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, u32>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, Option<String>>(10)?,
                    ))
                },
            )?;
            let run = build_run(
                row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9, row.10,
            )?;
            let outcome = if decision {
                ApprovalOutcome::Approved
            } else {
                ApprovalOutcome::Denied
            };
            Ok((run, outcome))
        })
    }

    fn get_approval(&self, request_id: &ApprovalId) -> StoreResult<Approval> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT request_id, run_id, sender, summary, command_preview, created_at, expires_at, status
                 FROM approvals WHERE request_id = ?1",
                params![request_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("approval {request_id}")))
            .and_then(|row| {
                Ok(Approval {
                    request_id: ApprovalId::from_str_lossy(&row.0),
                    run_id: RunId::try_from(row.1.as_str())?,
                    sender: Sender::normalize(&row.2),
                    summary: row.3,
                    command_preview: row.4,
                    created_at: parse_rfc3339(&row.5)?,
                    expires_at: parse_rfc3339(&row.6)?,
                    status: ApprovalStatus::from_str(&row.7)?,
                })
            })
        })
    }

    fn pending_approvals_for_sender(&self, sender: &Sender) -> StoreResult<Vec<Approval>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, run_id, sender, summary, command_preview, created_at, expires_at, status
                 FROM approvals WHERE sender = ?1 AND status = 'pending'",
            )?;
            let rows = stmt.query_map(params![sender.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;
            let mut approvals = Vec::new();
            for row in rows {
                let row = row?;
                approvals.push(Approval {
                    request_id: ApprovalId::from_str_lossy(&row.0),
                    run_id: RunId::try_from(row.1.as_str())?,
                    sender: Sender::normalize(&row.2),
                    summary: row.3,
                    command_preview: row.4,
                    created_at: parse_rfc3339(&row.5)?,
                    expires_at: parse_rfc3339(&row.6)?,
                    status: ApprovalStatus::from_str(&row.7)?,
                });
            }
            Ok(approvals)
        })
    }

    fn list_pending_approvals(&self, limit: usize) -> StoreResult<Vec<Approval>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, run_id, sender, summary, command_preview, created_at, expires_at, status
                 FROM approvals WHERE status = 'pending' ORDER BY created_at ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })?;
            let mut approvals = Vec::new();
            for row in rows {
                let row = row?;
                approvals.push(Approval {
                    request_id: ApprovalId::from_str_lossy(&row.0),
                    run_id: RunId::try_from(row.1.as_str())?,
                    sender: Sender::normalize(&row.2),
                    summary: row.3,
                    command_preview: row.4,
                    created_at: parse_rfc3339(&row.5)?,
                    expires_at: parse_rfc3339(&row.6)?,
                    status: ApprovalStatus::from_str(&row.7)?,
                });
            }
            Ok(approvals)
        })
    }

    fn expire_due_approvals(&self, now: DateTime<Utc>) -> StoreResult<Vec<ApprovalId>> {
        self.with_write(|conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, run_id FROM approvals WHERE status = 'pending' AND expires_at <= ?1",
            )?;
            let due: Vec<(String, String)> = stmt
                .query_map(params![to_rfc3339(now)], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<_, _>>()?;
            let mut expired = Vec::with_capacity(due.len());
            for (request_id, run_id) in due {
                conn.execute(
                    "UPDATE approvals SET status = 'expired' WHERE request_id = ?1",
                    params![request_id],
                )?;
                conn.execute(
                    "UPDATE runs SET state = ?1 WHERE run_id = ?2",
                    params![RunState::Expired.as_str(), run_id],
                )?;
                expired.push(ApprovalId::from_str_lossy(&request_id));
            }
            Ok(expired)
        })
    }

    fn append_event(&self, kind: &str, payload: serde_json::Value, now: DateTime<Utc>) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO events (timestamp, kind, payload) VALUES (?1, ?2, ?3)",
                params![to_rfc3339(now), kind, payload.to_string()],
            )?;
            Ok(())
        })
    }

    fn recent_events(&self, limit: usize) -> StoreResult<Vec<StoredEvent>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, kind, payload FROM events ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            let mut events = Vec::new();
            for row in rows {
                let (id, timestamp, kind, payload) = row?;
                events.push(StoredEvent {
                    id,
                    timestamp: parse_rfc3339(&timestamp)?,
                    kind,
                    payload: serde_json::from_str(&payload)?,
                });
            }
            Ok(events)
        })
    }

    fn schedule_action(
        &self,
        id: ScheduledActionId,
        run_id: Option<RunId>,
        sender: &Sender,
        channel: Channel,
        fire_at: DateTime<Utc>,
        kind: ScheduledActionKind,
        max_nudges: u32,
        payload: &str,
    ) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO scheduled_actions (id, run_id, sender, channel, fire_at, kind, nudges_sent, max_nudges, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
                params![
                    id.to_string(),
                    run_id.map(|r| r.to_string()),
                    sender.as_str(),
                    channel.as_str(),
                    to_rfc3339(fire_at),
                    kind.as_str(),
                    max_nudges,
                    payload,
                ],
            )?;
            Ok(())
        })
    }

    fn due_actions(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ScheduledAction>> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, run_id, sender, channel, fire_at, kind, nudges_sent, max_nudges, payload
                 FROM scheduled_actions WHERE fire_at <= ?1 ORDER BY fire_at ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![to_rfc3339(now), limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?;
            let mut actions = Vec::new();
            for row in rows {
                let row = row?;
                actions.push(ScheduledAction {
                    id: row.0.parse().map_err(|_| {
                        StoreError::NotFound(format!("malformed scheduled action id {:?}", row.0))
                    })?,
                    run_id: row.1.map(|r| RunId::try_from(r.as_str())).transpose()?,
                    sender: Sender::normalize(&row.2),
                    channel: row
                        .3
                        .parse()
                        .map_err(|_| StoreError::NotFound(format!("unknown channel {:?}", row.3)))?,
                    fire_at: parse_rfc3339(&row.4)?,
                    kind: ScheduledActionKind::from_str(&row.5)?,
                    nudges_sent: row.6,
                    max_nudges: row.7,
                    payload: row.8,
                });
            }
            Ok(actions)
        })
    }

    fn mark_action_fired(&self, id: &ScheduledActionId, success: bool) -> StoreResult<()> {
        let _ = success;
        self.with_write(|conn| {
            conn.execute(
                "UPDATE scheduled_actions SET nudges_sent = nudges_sent + 1 WHERE id = ?1",
                params![id.to_string()],
            )?;
            Ok(())
        })
    }

    fn remove_action(&self, id: &ScheduledActionId) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute("DELETE FROM scheduled_actions WHERE id = ?1", params![id.to_string()])?;
            Ok(())
        })
    }

    fn reschedule_action(&self, id: &ScheduledActionId, fire_at: DateTime<Utc>) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "UPDATE scheduled_actions SET fire_at = ?1 WHERE id = ?2",
                params![to_rfc3339(fire_at), id.to_string()],
            )?;
            Ok(())
        })
    }

    fn kv_get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_read(|conn| {
            Ok(conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
                .optional()?)
        })
    }

    fn kv_put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn search_messages(&self, sender: &Sender, escaped_pattern: &str) -> StoreResult<Vec<StoredMessage>> {
        self.with_read(|conn| {
            let like = format!("%{escaped_pattern}%");
            let mut stmt = conn.prepare(
                "SELECT id, channel, sender, direction, external_id, text, recorded_at
                 FROM messages WHERE sender = ?1 AND text LIKE ?2 ESCAPE '\\'
                 ORDER BY recorded_at DESC",
            )?;
            let rows = stmt.query_map(params![sender.as_str(), like], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?;
            let mut messages = Vec::new();
            for row in rows {
                let row = row?;
                messages.push(StoredMessage {
                    id: row.0,
                    channel: row
                        .1
                        .parse()
                        .map_err(|_| StoreError::NotFound(format!("unknown channel {:?}", row.1)))?,
                    sender: Sender::normalize(&row.2),
                    direction: MessageDirection::from_str(&row.3)?,
                    external_id: row.4,
                    text: row.5,
                    recorded_at: parse_rfc3339(&row.6)?,
                });
            }
            Ok(messages)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageDirection;

    fn sender(s: &str) -> Sender {
        Sender::normalize(s)
    }

    #[test]
    fn migrations_apply_exactly_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        // Re-running open-style migration logic against the same connection
        // must be a no-op; exercised indirectly by creating a session twice.
        let s1 = store.create_session(Channel::Chat, &sender("+15551234567")).unwrap();
        let s2 = store.create_session(Channel::Chat, &sender("+15551234567")).unwrap();
        assert_eq!(s1.id, s2.id);
    }

    #[test]
    fn record_message_dedupes_by_external_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let s = sender("+15551234567");
        let now = Utc::now();
        let first = store
            .record_message(Channel::Mail, &s, MessageDirection::Inbound, Some("msg-1"), "hi", now)
            .unwrap();
        assert!(first.is_some());
        let second = store
            .record_message(Channel::Mail, &s, MessageDirection::Inbound, Some("msg-1"), "hi", now)
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn run_lifecycle_transitions_and_reads_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run_id = RunId::new();
        let s = sender("+15551234567");
        let now = Utc::now();
        store
            .create_run(run_id, &s, Channel::Chat, RunKind::Chat, "summary", "preview", now)
            .unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.state, RunState::Received);

        store
            .update_run_state(
                run_id,
                RunState::Completed,
                RunStateUpdate {
                    result: Some("done".to_string()),
                    checkpoint_context: None,
                    attempts_delta: 1,
                },
            )
            .unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.result.as_deref(), Some("done"));
        assert_eq!(run.attempts, 1);
    }

    #[test]
    fn approval_resolve_denies_and_transitions_run() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run_id = RunId::new();
        let s = sender("+15551234567");
        let now = Utc::now();
        store
            .create_run(run_id, &s, Channel::Chat, RunKind::Task, "summary", "preview", now)
            .unwrap();
        store
            .update_run_state(run_id, RunState::AwaitingApproval, RunStateUpdate::default())
            .unwrap();
        let request_id = ApprovalId::from_str_lossy("abc123");
        store
            .create_approval(request_id.clone(), run_id, &s, "do the thing", "preview", now, chrono::Duration::seconds(600))
            .unwrap();

        let (run, outcome) = store.resolve_approval(&request_id, false).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Denied);
        assert_eq!(run.state, RunState::Denied);
    }

    #[test]
    fn expire_due_approvals_transitions_run_to_expired() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run_id = RunId::new();
        let s = sender("+15551234567");
        let created_at = Utc::now() - chrono::Duration::seconds(700);
        store
            .create_run(run_id, &s, Channel::Chat, RunKind::Task, "summary", "preview", created_at)
            .unwrap();
        store
            .update_run_state(run_id, RunState::AwaitingApproval, RunStateUpdate::default())
            .unwrap();
        let request_id = ApprovalId::from_str_lossy("xyz789");
        store
            .create_approval(request_id.clone(), run_id, &s, "do the thing", "preview", created_at, chrono::Duration::seconds(600))
            .unwrap();

        let expired = store.expire_due_approvals(Utc::now()).unwrap();
        assert_eq!(expired, vec![request_id]);
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.state, RunState::Expired);
    }

    #[test]
    fn search_messages_escapes_like_wildcards() {
        let store = SqliteStore::open_in_memory().unwrap();
        let s = sender("+15551234567");
        let now = Utc::now();
        store
            .record_message(Channel::Chat, &s, MessageDirection::Inbound, None, "50% off today", now)
            .unwrap();
        store
            .record_message(Channel::Chat, &s, MessageDirection::Inbound, None, "50X off today", now)
            .unwrap();
        let escaped = courier_core::util::escape_like_pattern("50%");
        let found = store.search_messages(&s, &escaped).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].text.starts_with("50%"));
    }

    #[test]
    fn list_sessions_returns_most_recently_updated_first() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_session(Channel::Chat, &sender("+15551234567")).unwrap();
        store.create_session(Channel::Mail, &sender("a@example.com")).unwrap();
        let sessions = store.list_sessions(10).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn list_pending_approvals_ignores_resolved() {
        let store = SqliteStore::open_in_memory().unwrap();
        let run_id = RunId::new();
        let s = sender("+15551234567");
        let now = Utc::now();
        store
            .create_run(run_id, &s, Channel::Chat, RunKind::Task, "summary", "preview", now)
            .unwrap();
        let request_id = ApprovalId::from_str_lossy("pending1");
        store
            .create_approval(request_id.clone(), run_id, &s, "do the thing", "preview", now, chrono::Duration::seconds(600))
            .unwrap();
        let pending = store.list_pending_approvals(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, request_id);

        store.resolve_approval(&request_id, true).unwrap();
        assert!(store.list_pending_approvals(10).unwrap().is_empty());
    }

    #[test]
    fn kv_put_overwrites_existing_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.kv_put("mute", "false").unwrap();
        store.kv_put("mute", "true").unwrap();
        assert_eq!(store.kv_get("mute").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn due_actions_respects_fire_at_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let s = sender("+15551234567");
        let now = Utc::now();
        for i in 0..3 {
            store
                .schedule_action(
                    ScheduledActionId::new(),
                    None,
                    &s,
                    Channel::Chat,
                    now - chrono::Duration::seconds(i),
                    ScheduledActionKind::FollowUp,
                    3,
                    "payload",
                )
                .unwrap();
        }
        let due = store.due_actions(now, 2).unwrap();
        assert_eq!(due.len(), 2);
    }

    #[test]
    fn reschedule_action_moves_fire_at_into_the_future() {
        let store = SqliteStore::open_in_memory().unwrap();
        let s = sender("+15551234567");
        let now = Utc::now();
        let id = ScheduledActionId::new();
        store
            .schedule_action(id.clone(), None, &s, Channel::Chat, now, ScheduledActionKind::FollowUp, 3, "payload")
            .unwrap();
        assert_eq!(store.due_actions(now, 10).unwrap().len(), 1);

        let later = now + chrono::Duration::hours(1);
        store.reschedule_action(&id, later).unwrap();
        assert!(store.due_actions(now, 10).unwrap().is_empty());
        assert_eq!(store.due_actions(later, 10).unwrap().len(), 1);
    }
}
