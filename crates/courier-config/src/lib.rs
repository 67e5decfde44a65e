//! Layered TOML configuration for the courier daemon.
//!
//! Four layers, each optional except the embedded defaults: built-in
//! defaults, `/etc/courier/config.toml` (system), `~/.config/courier/config.toml`
//! (user), and an optional workspace-local file. Later layers win on a
//! per-field basis.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_defaults, ConfigPaths};
pub use types::{
    ApprovalConfig, ChannelsConfig, Config, ConnectorConfig, HttpConfig, MemoryConfig,
    ProactiveConfig, QuietHoursConfig, RateLimitConfig, SendersConfig, TimeoutsConfig,
    WorkspaceAlias, WorkspaceConfig,
};
