//! The chat database reader: opens the platform message
//! store read-only and queries messages newer than a stored cursor.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{Channel, Sender};
use rusqlite::{Connection, OpenFlags};
use serde_json::json;

use crate::error::{ChannelError, ChannelResult};
use crate::fingerprint::FingerprintCache;
use crate::types::InboundMessage;
use crate::IngressAdapter;

const CURSOR_ROWID_KEY: &str = "ingress.chat.cursor.rowid";
const CURSOR_RECEIVED_AT_KEY: &str = "ingress.chat.cursor.received_at";

/// Reads new rows from the platform chat database, tracking an
/// `(last_rowid, last_received_at)` cursor in the durable key-value store so
/// it survives restarts and clock drift.
pub struct ChatReader {
    db_path: PathBuf,
    store: Arc<dyn courier_storage::Store>,
    fingerprints: Arc<FingerprintCache>,
    allowed_senders: Vec<String>,
    filter_at_source: bool,
}

impl ChatReader {
    /// Build a reader against `db_path`, persisting its cursor in `store`.
    /// When `filter_at_source` is set, the query itself restricts to
    /// `allowed_senders` rather than leaving that entirely to the policy
    /// layer.
    #[must_use]
    pub fn new(
        db_path: impl Into<PathBuf>,
        store: Arc<dyn courier_storage::Store>,
        fingerprints: Arc<FingerprintCache>,
        allowed_senders: Vec<String>,
        filter_at_source: bool,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            store,
            fingerprints,
            allowed_senders,
            filter_at_source,
        }
    }

    fn cursor(&self) -> ChannelResult<(i64, DateTime<Utc>)> {
        let rowid = self
            .store
            .kv_get(CURSOR_ROWID_KEY)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let received_at = self
            .store
            .kv_get(CURSOR_RECEIVED_AT_KEY)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok((rowid, received_at))
    }

    /// Seed the cursor to the current end of the table without emitting any
    /// messages, so a first run never replays the channel's pre-existing
    /// history when the startup historical-backlog flag is left off. A no-op
    /// once a cursor has already been recorded.
    pub fn skip_existing_backlog(&self) -> ChannelResult<()> {
        let already_seeded = self
            .store
            .kv_get(CURSOR_ROWID_KEY)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?
            .is_some();
        if already_seeded {
            return Ok(());
        }
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
        let max_rowid: i64 = conn
            .query_row("SELECT COALESCE(MAX(rowid), 0) FROM messages", [], |row| row.get(0))
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
        self.advance_cursor(max_rowid, Utc::now())
    }

    fn advance_cursor(&self, rowid: i64, received_at: DateTime<Utc>) -> ChannelResult<()> {
        self.store
            .kv_put(CURSOR_ROWID_KEY, &rowid.to_string())
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
        self.store
            .kv_put(CURSOR_RECEIVED_AT_KEY, &received_at.to_rfc3339())
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
        Ok(())
    }

    fn query_new_rows(
        &self,
        since_rowid: i64,
        since_received_at: DateTime<Utc>,
    ) -> ChannelResult<Vec<(i64, String, String, DateTime<Utc>, bool)>> {
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;

        let mut sql = String::from(
            "SELECT rowid, sender, text, received_at, is_from_me FROM messages \
             WHERE (rowid > ?1 OR received_at > ?2)",
        );
        if self.filter_at_source && !self.allowed_senders.is_empty() {
            let placeholders: Vec<String> = (0..self.allowed_senders.len())
                .map(|i| format!("?{}", i + 3))
                .collect();
            sql.push_str(&format!(" AND sender IN ({})", placeholders.join(", ")));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;

        let since_received_at_str = since_received_at.to_rfc3339();
        let mut params: Vec<&dyn rusqlite::ToSql> =
            vec![&since_rowid, &since_received_at_str];
        if self.filter_at_source {
            for sender in &self.allowed_senders {
                params.push(sender);
            }
        }

        let rows = stmt
            .query_map(params.as_slice(), |row| {
                let rowid: i64 = row.get(0)?;
                let sender: String = row.get(1)?;
                let text: String = row.get(2)?;
                let received_at_raw: String = row.get(3)?;
                let is_from_me: i64 = row.get(4)?;
                Ok((rowid, sender, text, received_at_raw, is_from_me != 0))
            })
            .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (rowid, sender, text, received_at_raw, is_from_me) =
                row.map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
            let received_at = DateTime::parse_from_rfc3339(&received_at_raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ChannelError::new(Channel::Chat, e.to_string()))?;
            out.push((rowid, sender, text, received_at, is_from_me));
        }
        Ok(out)
    }
}

#[async_trait]
impl IngressAdapter for ChatReader {
    fn channel(&self) -> Channel {
        Channel::Chat
    }

    async fn poll(&self) -> ChannelResult<Vec<InboundMessage>> {
        let (since_rowid, since_received_at) = self.cursor()?;
        let rows = self.query_new_rows(since_rowid, since_received_at)?;

        let mut out = Vec::with_capacity(rows.len());
        let mut max_rowid = since_rowid;
        let mut max_received_at = since_received_at;

        for (rowid, sender_raw, text, received_at, is_from_me) in rows {
            max_rowid = max_rowid.max(rowid);
            if received_at > max_received_at {
                max_received_at = received_at;
            }

            let sender = Sender::normalize(&sender_raw);
            if self.fingerprints.is_recent_echo(Channel::Chat, &sender, &text) {
                continue;
            }

            out.push(InboundMessage {
                id: format!("chat:{rowid}"),
                channel: Channel::Chat,
                sender,
                text,
                received_at,
                is_self: is_from_me,
                attachments: Vec::new(),
                context_metadata: json!({ "rowid": rowid }),
            });
        }

        self.advance_cursor(max_rowid, max_received_at)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_storage::SqliteStore;
    use std::time::Duration;

    fn seed_db(path: &std::path::Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "CREATE TABLE messages (sender TEXT, text TEXT, received_at TEXT, is_from_me INTEGER)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages (sender, text, received_at, is_from_me) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                "+15551234567",
                "hello there",
                "2026-01-01T00:00:00Z",
                0
            ],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages (sender, text, received_at, is_from_me) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                "+15559876543",
                "a reply we sent",
                "2026-01-01T00:01:00Z",
                1
            ],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn poll_yields_new_rows_and_advances_the_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chat.db");
        seed_db(&db_path);

        let store: Arc<dyn courier_storage::Store> =
            Arc::new(SqliteStore::open_in_memory().unwrap());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let reader = ChatReader::new(db_path, store, fingerprints, Vec::new(), false);

        let first = reader.poll().await.unwrap();
        assert_eq!(first.len(), 2);

        let second = reader.poll().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn echoed_own_reply_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chat.db");
        seed_db(&db_path);

        let store: Arc<dyn courier_storage::Store> =
            Arc::new(SqliteStore::open_in_memory().unwrap());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        fingerprints.check_and_record(
            Channel::Chat,
            &Sender::normalize("+15551234567"),
            "hello there",
        );
        let reader = ChatReader::new(db_path, store, fingerprints, Vec::new(), false);

        let messages = reader.poll().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "a reply we sent");
    }

    #[tokio::test]
    async fn skip_existing_backlog_suppresses_pre_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("chat.db");
        seed_db(&db_path);

        let store: Arc<dyn courier_storage::Store> =
            Arc::new(SqliteStore::open_in_memory().unwrap());
        let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(90)));
        let reader = ChatReader::new(db_path, store, fingerprints, Vec::new(), false);

        reader.skip_existing_backlog().unwrap();
        let messages = reader.poll().await.unwrap();
        assert!(messages.is_empty());
    }
}
