//! Logging setup: a configurable `tracing` subscriber with a pluggable
//! output format and target.

use crate::error::{TelemetryError, TelemetryResult};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output encoding for emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line, for interactive terminals.
    Pretty,
    /// Single-line compact text, for journald/systemd capture.
    Compact,
    /// Newline-delimited JSON, for log aggregators.
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Standard error.
    Stderr,
    /// A rolling daily file under the given directory, with the given file
    /// name prefix.
    RollingFile {
        /// Directory the rolling file appender writes into.
        directory: PathBuf,
        /// File name prefix, e.g. `"courier"` produces `courier.2026-07-26`.
        prefix: String,
    },
}

/// Logging configuration, built up with a fluent `with_*` API matching the
/// teacher's `LogConfig`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    default_directive: String,
    extra_directives: Vec<String>,
    format: LogFormat,
    target: LogTarget,
    ansi: bool,
}

impl LogConfig {
    /// Start from a base level directive, e.g. `"info"` or `"debug"`.
    #[must_use]
    pub fn new(default_directive: impl Into<String>) -> Self {
        Self {
            default_directive: default_directive.into(),
            extra_directives: Vec::new(),
            format: LogFormat::Compact,
            target: LogTarget::Stderr,
            ansi: true,
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Append a per-module directive, e.g. `"courier_connector=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Disable ANSI colour codes, for non-interactive output such as a
    /// rolling log file.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut directive = self.default_directive.clone();
        for extra in &self.extra_directives {
            directive.push(',');
            directive.push_str(extra);
        }
        EnvFilter::try_new(&directive)
            .map_err(|err| TelemetryError::ConfigError(format!("{directive:?}: {err}")))
    }
}

/// Install a global subscriber built from `config`.
///
/// Returns a guard that must be kept alive for the process lifetime when
/// `config.target` is a rolling file (dropping it flushes the background
/// writer thread). For [`LogTarget::Stderr`] the guard is a no-op.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = config.env_filter()?;

    match &config.target {
        LogTarget::Stderr => {
            install(config, filter, std::io::stderr)?;
            Ok(None)
        }
        LogTarget::RollingFile { directory, prefix } => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            install_writer(config, filter, non_blocking)?;
            Ok(Some(guard))
        }
    }
}

fn install<W>(config: &LogConfig, filter: EnvFilter, writer: W) -> TelemetryResult<()>
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    install_writer(config, filter, writer)
}

fn install_writer<W>(config: &LogConfig, filter: EnvFilter, writer: W) -> TelemetryResult<()>
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_ansi(config.ansi).with_writer(writer))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_ansi(config.ansi).with_writer(writer))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };
    result.map_err(|err| TelemetryError::InitError(err.to_string()))
}

/// Install a reasonable default: compact, info-level, stderr. Used by tests
/// and by the CLI's one-shot subcommands that don't read config.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info")).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_combines_default_and_extra_directives() {
        let config = LogConfig::new("info").with_directive("courier_connector=trace");
        let filter = config.env_filter().unwrap();
        assert!(filter.to_string().contains("courier_connector=trace"));
    }

    #[test]
    fn rejects_malformed_directive() {
        let config = LogConfig::new("not a valid directive!!");
        assert!(matches!(config.env_filter(), Err(TelemetryError::ConfigError(_))));
    }
}
