//! Forward-only, versioned schema migrations, tracked via `PRAGMA user_version`.

/// Ordered `(version, sql)` pairs. Each is applied exactly once, in order,
/// inside its own transaction, against a fresh or existing database file.
pub const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        r"
        CREATE TABLE sessions (
            id          TEXT PRIMARY KEY,
            channel     TEXT NOT NULL,
            sender      TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(channel, sender)
        );

        CREATE TABLE messages (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            channel      TEXT NOT NULL,
            sender       TEXT NOT NULL,
            direction    TEXT NOT NULL,
            external_id  TEXT,
            text         TEXT NOT NULL,
            recorded_at  TEXT NOT NULL
        );
        CREATE UNIQUE INDEX idx_messages_dedupe ON messages(channel, external_id)
            WHERE external_id IS NOT NULL;
        CREATE INDEX idx_messages_sender ON messages(sender, recorded_at);

        CREATE TABLE runs (
            run_id              TEXT PRIMARY KEY,
            sender              TEXT NOT NULL,
            channel             TEXT NOT NULL,
            kind                TEXT NOT NULL,
            state               TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            prompt_summary      TEXT NOT NULL,
            command_preview     TEXT NOT NULL,
            result              TEXT,
            attempts            INTEGER NOT NULL DEFAULT 0,
            checkpoint_context  TEXT
        );
        CREATE INDEX idx_runs_sender ON runs(sender);
        CREATE INDEX idx_runs_state ON runs(state);

        CREATE TABLE approvals (
            request_id       TEXT PRIMARY KEY,
            run_id           TEXT NOT NULL REFERENCES runs(run_id),
            sender           TEXT NOT NULL,
            summary          TEXT NOT NULL,
            command_preview  TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            expires_at       TEXT NOT NULL,
            status           TEXT NOT NULL
        );
        CREATE INDEX idx_approvals_sender ON approvals(sender, status);
        CREATE INDEX idx_approvals_run ON approvals(run_id);

        CREATE TABLE events (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp  TEXT NOT NULL,
            kind       TEXT NOT NULL,
            payload    TEXT NOT NULL
        );
        CREATE INDEX idx_events_timestamp ON events(timestamp);

        CREATE TABLE scheduled_actions (
            id          TEXT PRIMARY KEY,
            run_id      TEXT REFERENCES runs(run_id),
            sender      TEXT NOT NULL,
            channel     TEXT NOT NULL,
            fire_at     TEXT NOT NULL,
            kind        TEXT NOT NULL,
            nudges_sent INTEGER NOT NULL DEFAULT 0,
            max_nudges  INTEGER NOT NULL,
            payload     TEXT NOT NULL
        );
        CREATE INDEX idx_scheduled_fire_at ON scheduled_actions(fire_at);

        CREATE TABLE kv (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );
        ",
    ),
];
