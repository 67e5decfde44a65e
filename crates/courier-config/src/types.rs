//! The `Config` root struct and its sections.
//!
//! Every section derives `Default` with concrete production defaults (matching
//! the existing `astrid-config::types` convention) and is merged layer over
//! layer by [`crate::load`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The fully resolved configuration tree.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sender allowlist and self-echo suppression.
    pub senders: SendersConfig,
    /// Named workspace aliases the connector is allowed to operate in.
    pub workspace: WorkspaceConfig,
    /// The selected AI subprocess connector.
    pub connector: ConnectorConfig,
    /// Per-channel enable flags and resource names.
    pub channels: ChannelsConfig,
    /// Timeouts for connector turns and platform scripting calls.
    pub timeouts: TimeoutsConfig,
    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Approval time-to-live and resume policy.
    pub approval: ApprovalConfig,
    /// Quiet-hour window during which the companion sends no proactive messages.
    pub quiet_hours: QuietHoursConfig,
    /// Memory/context bounds injected into every connector call.
    pub memory: MemoryConfig,
    /// Trigger tag required on non-chat, non-HTTP channel items.
    pub trigger_tag: String,
    /// Path to a soul/personality prompt file, injected verbatim.
    pub soul_file: Option<String>,
    /// The HTTP admin surface.
    pub http: HttpConfig,
    /// Companion loop / follow-up / ambient scanner cadence and limits.
    pub proactive: ProactiveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            senders: SendersConfig::default(),
            workspace: WorkspaceConfig::default(),
            connector: ConnectorConfig::default(),
            channels: ChannelsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            approval: ApprovalConfig::default(),
            quiet_hours: QuietHoursConfig::default(),
            memory: MemoryConfig::default(),
            trigger_tag: "!!agent".to_string(),
            soul_file: None,
            http: HttpConfig::default(),
            proactive: ProactiveConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("senders", &self.senders)
            .field("workspace", &self.workspace)
            .field("connector", &self.connector)
            .field("channels", &self.channels)
            .field("timeouts", &self.timeouts)
            .field("rate_limit", &self.rate_limit)
            .field("approval", &self.approval)
            .field("quiet_hours", &self.quiet_hours)
            .field("memory", &self.memory)
            .field("trigger_tag", &self.trigger_tag)
            .field("soul_file", &self.soul_file)
            .field("http", &self.http)
            .field("proactive", &self.proactive)
            .finish()
    }
}

/// Sender allowlist and echo handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SendersConfig {
    /// Comma-separated normalized identifiers allowed to dispatch commands.
    pub allowed: Vec<String>,
    /// Whether inbound messages flagged `is_self` are dropped as echo.
    pub suppress_self: bool,
    /// Whether inbound text must start with `chat_prefix` to be accepted.
    pub prefix_mode: bool,
    /// The configured chat prefix, checked case-insensitively.
    pub chat_prefix: String,
}

impl Default for SendersConfig {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            suppress_self: true,
            prefix_mode: false,
            chat_prefix: "!".to_string(),
        }
    }
}

/// A named workspace alias mapping to an absolute directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceAlias {
    /// The short alias name used in `@alias` prefixes.
    pub name: String,
    /// The absolute directory path the connector is allowed to operate in.
    pub path: String,
}

/// Workspace alias table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// All configured aliases.
    pub aliases: Vec<WorkspaceAlias>,
    /// The alias used when no `@alias` is present in the inbound text.
    pub default_alias: Option<String>,
}

/// The selected AI subprocess connector.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Human-readable connector name (e.g. "claude-cli").
    pub name: String,
    /// The executable to spawn.
    pub command: String,
    /// Fixed arguments always passed to the executable.
    pub args: Vec<String>,
    /// The model identifier passed through to the subprocess, if applicable.
    pub model: Option<String>,
    /// Whether a timed-out turn becomes `CHECKPOINTED` instead of `FAILED`.
    pub checkpoint_on_timeout: bool,
    /// Maximum number of resume attempts for a checkpointed run.
    pub max_resume_attempts: u32,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            name: "cli-assistant".to_string(),
            command: "ai".to_string(),
            args: Vec::new(),
            model: None,
            checkpoint_on_timeout: true,
            max_resume_attempts: 5,
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("model", &self.model)
            .field("checkpoint_on_timeout", &self.checkpoint_on_timeout)
            .field("max_resume_attempts", &self.max_resume_attempts)
            .finish()
    }
}

/// Per-channel enable flags and platform resource names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Whether the chat database reader/writer are active.
    pub chat_enabled: bool,
    /// Whether the mail reader/writer are active.
    pub mail_enabled: bool,
    /// Whether the reminders reader/writer are active.
    pub reminders_enabled: bool,
    /// Whether the notes reader is active.
    pub notes_enabled: bool,
    /// Whether the calendar reader is active.
    pub calendar_enabled: bool,
    /// The designated reminders list name to poll.
    pub reminders_list: String,
    /// The designated reminders archive list name.
    pub reminders_archive_list: String,
    /// The designated notes folder name to poll.
    pub notes_folder: String,
    /// The calendar lookahead window, in minutes.
    pub calendar_lookahead_minutes: u32,
    /// Maximum age, in minutes, for an unread mail message to be ingested.
    pub mail_max_age_minutes: u32,
    /// Per-channel chunk size, in characters, for outbound text.
    pub max_chunk_chars: HashMap<String, usize>,
    /// Path to the platform message store the chat reader opens read-only.
    pub chat_db_path: String,
    /// Whether the chat reader's own query filters on allowlisted senders,
    /// rather than leaving that entirely to the policy layer.
    pub chat_filter_senders_at_source: bool,
    /// The suppression window for the shared egress fingerprint cache, in
    /// seconds.
    pub fingerprint_window_secs: u64,
    /// Whether the chat reader processes messages that predate the daemon's
    /// very first run. When `false` (the default), the first startup seeds
    /// the chat cursor to the current end of the table instead of replaying
    /// history.
    pub process_historical_on_first_run: bool,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            chat_enabled: true,
            mail_enabled: true,
            reminders_enabled: true,
            notes_enabled: true,
            calendar_enabled: true,
            reminders_list: "Inbox".to_string(),
            reminders_archive_list: "Archive".to_string(),
            notes_folder: "Agent".to_string(),
            calendar_lookahead_minutes: 60,
            mail_max_age_minutes: 1440,
            max_chunk_chars: HashMap::new(),
            chat_db_path: "~/Library/Messages/chat.db".to_string(),
            chat_filter_senders_at_source: false,
            fingerprint_window_secs: 90,
            process_historical_on_first_run: false,
        }
    }
}

/// Timeouts for connector turns and scripting calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per-turn connector timeout, in seconds. Default 5 minutes.
    pub connector_turn_secs: u64,
    /// Per-call platform scripting timeout, in seconds.
    pub scripting_call_secs: u64,
    /// Graceful-shutdown grace period for joining supervised tasks, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            connector_turn_secs: 300,
            scripting_call_secs: 15,
            shutdown_grace_secs: 10,
        }
    }
}

/// Sliding-window rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// The sliding window length, in seconds.
    pub window_secs: u64,
    /// The maximum number of messages allowed per sender within the window.
    pub max_messages: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_messages: 10,
        }
    }
}

/// Approval time-to-live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Approval time-to-live, in seconds.
    pub ttl_secs: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

/// Quiet-hour window during which the companion sends no proactive messages.
///
/// Hours are local-time, 0-23; the window may cross midnight (`start > end`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHoursConfig {
    /// The hour (0-23) quiet hours begin.
    pub start_hour: u32,
    /// The hour (0-23) quiet hours end.
    pub end_hour: u32,
}

impl Default for QuietHoursConfig {
    fn default() -> Self {
        Self {
            start_hour: 22,
            end_hour: 7,
        }
    }
}

impl QuietHoursConfig {
    /// Whether the given local hour (0-23) falls within quiet hours, handling
    /// the midnight-crossing case (`start_hour > end_hour`).
    #[must_use]
    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.start_hour == self.end_hour {
            return false;
        }
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Memory/context bounds injected into every connector call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum characters of topic-memory snippet injected per turn.
    pub max_context_chars: usize,
    /// Number of prior session exchanges kept as context.
    pub session_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 4000,
            session_window: 10,
        }
    }
}

/// The HTTP admin surface.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whether the HTTP admin surface is enabled.
    pub enabled: bool,
    /// The bind host.
    pub host: String,
    /// The bind port.
    pub port: u16,
    /// An optional bearer token; when set, all routes except `/health` require it.
    pub bearer_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8787,
            bearer_token: None,
        }
    }
}

impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("has_bearer_token", &self.bearer_token.is_some())
            .finish()
    }
}

/// Companion loop / follow-up scheduler / ambient scanner cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProactiveConfig {
    /// Maximum proactive (companion) messages sent per sliding hour.
    pub max_proactive_per_hour: u32,
    /// How often the companion loop wakes to observe, in seconds.
    pub companion_interval_secs: u64,
    /// How often the follow-up scheduler polls for due actions, in seconds.
    pub scheduler_interval_secs: u64,
    /// How often the ambient scanner reads passive channels, in seconds.
    pub ambient_interval_secs: u64,
    /// Maximum nudges sent for a single scheduled follow-up.
    pub max_nudges: u32,
    /// Clock hour (0-23, local) the daily digest is written.
    pub daily_digest_hour: u32,
    /// Directory the daily digest and weekly review are written into, as
    /// plain markdown files rather than through any egress adapter.
    pub office_daily_dir: String,
    /// Age, in minutes, past which a pending approval is called out in the
    /// companion's proactive observation brief.
    pub stale_approval_minutes: u32,
    /// Whether a completed mutating run schedules a follow-up nudge.
    pub follow_up_enabled: bool,
    /// Delay, in seconds, before a post-completion follow-up nudge fires,
    /// and the spacing between repeat nudges while the budget lasts.
    pub follow_up_delay_secs: u64,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            max_proactive_per_hour: 2,
            companion_interval_secs: 900,
            scheduler_interval_secs: 30,
            ambient_interval_secs: 1800,
            max_nudges: 3,
            daily_digest_hour: 18,
            office_daily_dir: "~/agent-office/daily".to_string(),
            stale_approval_minutes: 120,
            follow_up_enabled: true,
            follow_up_delay_secs: 86_400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_hours_handles_midnight_crossing() {
        let qh = QuietHoursConfig {
            start_hour: 22,
            end_hour: 7,
        };
        assert!(qh.contains_hour(23));
        assert!(qh.contains_hour(0));
        assert!(qh.contains_hour(6));
        assert!(!qh.contains_hour(7));
        assert!(!qh.contains_hour(21));
    }

    #[test]
    fn quiet_hours_handles_same_day_window() {
        let qh = QuietHoursConfig {
            start_hour: 1,
            end_hour: 5,
        };
        assert!(qh.contains_hour(3));
        assert!(!qh.contains_hour(6));
        assert!(!qh.contains_hour(0));
    }

    #[test]
    fn default_config_is_internally_consistent() {
        let cfg = Config::default();
        assert_eq!(cfg.trigger_tag, "!!agent");
        assert!(cfg.http.enabled);
        assert!(cfg.http.bearer_token.is_none());
    }

    #[test]
    fn http_config_debug_redacts_bearer_token() {
        let cfg = HttpConfig {
            bearer_token: Some("super-secret".to_string()),
            ..HttpConfig::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("has_bearer_token: true"));
    }
}
