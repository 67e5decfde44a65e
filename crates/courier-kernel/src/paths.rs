//! Daemon state file paths, grounded on the existing `DaemonPaths`
//! (`astrid-gateway::server::paths`).

use std::path::PathBuf;

use crate::error::{KernelError, KernelResult};

/// Where the daemon's own housekeeping files live under the user's data
/// directory: the single-instance PID file, a port file (for future CLI
/// `admin` discovery), and the log directory.
#[derive(Clone)]
pub struct DaemonPaths {
    /// Directory all daemon files live under, e.g. `~/.local/share/courier`.
    pub base_dir: PathBuf,
}

impl DaemonPaths {
    /// Resolve the standard per-platform data directory via `directories`.
    pub fn resolve() -> KernelResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "courier")
            .ok_or(KernelError::Config(courier_config::ConfigError::NoHomeDirectory))?;
        Ok(Self {
            base_dir: dirs.data_dir().to_path_buf(),
        })
    }

    /// Ensure `base_dir` (and its `logs` subdirectory) exist.
    pub fn ensure(&self) -> KernelResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    /// PID file path.
    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("courier.pid")
    }

    /// Port file path, written on startup when the admin HTTP surface binds.
    #[must_use]
    pub fn port_file(&self) -> PathBuf {
        self.base_dir.join("courier.port")
    }

    /// Directory the rolling daemon log is written into.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Path to the SQLite store file.
    #[must_use]
    pub fn db_file(&self) -> PathBuf {
        self.base_dir.join("courier.db")
    }
}
