//! `courier service` — install/uninstall/start/stop/status/logs against a
//! `launchd` user agent, so the daemon survives logout/login without a
//! terminal tab pinned open.
//!
//! Grounded on the existing `daemon_client::start_daemon` (`std::process::
//! Command` spawn, stderr redirected to a log file, poll for readiness)
//! adapted from "spawn a child directly" to "hand the spawn off to launchd".

use anyhow::{bail, Context, Result};
use colored::Colorize;
use courier_kernel::DaemonPaths;

const LAUNCHD_LABEL: &str = "com.courier.daemon";

fn plist_path() -> Result<std::path::PathBuf> {
    let dirs = directories::UserDirs::new().context("could not determine the home directory")?;
    Ok(dirs.home_dir().join("Library/LaunchAgents").join(format!("{LAUNCHD_LABEL}.plist")))
}

fn render_plist(exe: &std::path::Path, paths: &DaemonPaths) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCHD_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
        <string>daemon</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{log}</string>
    <key>StandardErrorPath</key>
    <string>{log}</string>
</dict>
</plist>
"#,
        exe = exe.display(),
        log = paths.log_dir().join("launchd.log").display(),
    )
}

/// Write the launch agent plist and load it.
pub fn install() -> Result<()> {
    let exe = std::env::current_exe().context("could not determine the current executable")?;
    let paths = DaemonPaths::resolve()?;
    paths.ensure()?;

    let plist = plist_path()?;
    if let Some(parent) = plist.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&plist, render_plist(&exe, &paths))?;

    run_launchctl(&["load", "-w", &plist.to_string_lossy()])?;
    println!("{}", format!("Installed and loaded {}", plist.display()).green());
    Ok(())
}

/// Unload the launch agent and remove its plist.
pub fn uninstall() -> Result<()> {
    let plist = plist_path()?;
    if plist.exists() {
        run_launchctl(&["unload", "-w", &plist.to_string_lossy()])?;
        std::fs::remove_file(&plist)?;
    }
    println!("{}", "Uninstalled the courier launch agent.".green());
    Ok(())
}

/// Ask launchd to start the agent now.
pub fn start() -> Result<()> {
    run_launchctl(&["start", LAUNCHD_LABEL])?;
    println!("Start requested.");
    Ok(())
}

/// Ask launchd to stop the agent now.
pub fn stop() -> Result<()> {
    run_launchctl(&["stop", LAUNCHD_LABEL])?;
    println!("Stop requested.");
    Ok(())
}

/// Report whether the daemon's PID file points at a live process.
pub fn status() -> Result<()> {
    let paths = DaemonPaths::resolve()?;
    if courier_kernel::is_running(&paths) {
        let pid = courier_kernel::read_pid(&paths).unwrap_or_default();
        println!("{}", format!("running (pid {pid})").green());
    } else {
        println!("{}", "not running".yellow());
    }
    Ok(())
}

/// Print the tail of the daemon's most recent rolling log file.
pub fn logs(lines: usize) -> Result<()> {
    let paths = DaemonPaths::resolve()?;
    let dir = paths.log_dir();
    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .with_context(|| format!("no log directory at {}", dir.display()))?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);
    let Some(latest) = entries.last() else {
        bail!("no log files found in {}", dir.display());
    };

    let content = std::fs::read_to_string(latest.path())?;
    for line in content.lines().rev().take(lines).collect::<Vec<_>>().into_iter().rev() {
        println!("{line}");
    }
    Ok(())
}

fn run_launchctl(args: &[&str]) -> Result<()> {
    let status = std::process::Command::new("launchctl")
        .args(args)
        .status()
        .context("failed to invoke launchctl")?;
    if !status.success() {
        bail!("launchctl {:?} exited with {status}", args);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_plist_embeds_the_executable_and_log_path() {
        let paths = DaemonPaths {
            base_dir: std::path::PathBuf::from("/tmp/courier-test"),
        };
        let rendered = render_plist(std::path::Path::new("/usr/local/bin/courier"), &paths);
        assert!(rendered.contains("/usr/local/bin/courier"));
        assert!(rendered.contains("launchd.log"));
        assert!(rendered.contains(LAUNCHD_LABEL));
    }
}
