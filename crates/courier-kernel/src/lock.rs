//! Single-instance lock: a PID file plus a liveness check, grounded on the
//! teacher's `DaemonServer::is_running`/`is_process_alive`
//! (`astrid-gateway::server`).

use crate::error::KernelResult;
use crate::paths::DaemonPaths;

/// Read the PID recorded in `paths`' PID file, if any.
#[must_use]
pub fn read_pid(paths: &DaemonPaths) -> Option<u32> {
    std::fs::read_to_string(paths.pid_file())
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Whether a daemon is currently running: a PID file exists and the
/// recorded process is alive.
#[must_use]
pub fn is_running(paths: &DaemonPaths) -> bool {
    read_pid(paths).is_some_and(is_process_alive)
}

fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Acquire the single-instance lock by writing this process's PID, failing
/// with [`crate::error::KernelError::AlreadyRunning`] if a live daemon
/// already holds it.
pub fn acquire(paths: &DaemonPaths) -> KernelResult<()> {
    if let Some(pid) = read_pid(paths) {
        if is_process_alive(pid) {
            return Err(crate::error::KernelError::AlreadyRunning(pid));
        }
        tracing::warn!(pid, "found a stale PID file; previous daemon did not exit cleanly");
    }
    std::fs::write(paths.pid_file(), std::process::id().to_string())?;
    Ok(())
}

/// Release the lock and any other housekeeping files written at startup.
pub fn release(paths: &DaemonPaths) {
    let _ = std::fs::remove_file(paths.pid_file());
    let _ = std::fs::remove_file(paths.port_file());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pid_file_means_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths { base_dir: dir.path().to_path_buf() };
        assert!(!is_running(&paths));
    }

    #[test]
    fn acquire_then_release_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths { base_dir: dir.path().to_path_buf() };
        acquire(&paths).unwrap();
        assert_eq!(read_pid(&paths), Some(std::process::id()));
        release(&paths);
        assert!(read_pid(&paths).is_none());
    }

    #[test]
    fn a_stale_pid_is_overwritten_rather_than_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DaemonPaths { base_dir: dir.path().to_path_buf() };
        std::fs::write(paths.pid_file(), "999999999").unwrap();
        acquire(&paths).unwrap();
        assert_eq!(read_pid(&paths), Some(std::process::id()));
    }
}
