//! Config error taxonomy: fatal at startup, exit 1.

use std::path::PathBuf;

/// Everything that can go wrong while locating, parsing, or validating config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file existed but could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file existed but was not valid TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged configuration failed a semantic validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The platform home directory could not be determined.
    #[error("could not determine a home directory for this platform")]
    NoHomeDirectory,
}

/// Convenience alias used throughout this crate.
pub type ConfigResult<T> = Result<T, ConfigError>;
