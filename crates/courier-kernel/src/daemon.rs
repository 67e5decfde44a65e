//! Process lifecycle: load configuration, open the store, wire every
//! channel, spawn the router and the three proactive loops, bind the admin
//! HTTP surface, and drive cooperative shutdown.
//!
//! Grounded on the existing `DaemonServer::start` / `shutdown_plugins` /
//! `cleanup` (`astrid-gateway::server::startup`/`lifecycle`): a PID file
//! doubles as the single-instance lock, a shared `broadcast` fires shutdown,
//! every supervised task selects against its own `watch` handle, and startup
//! only ever fails with a configuration or lock error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use courier_channels::ingress::HttpIngress;
use courier_channels::{FingerprintCache, InboundMessage};
use courier_config::Config;
use courier_connector::{Connector, SubprocessConnector};
use courier_events::EventBus;
use courier_orchestrator::OrchestratorCtx;
use courier_storage::{SqliteStore, Store};
use courier_telemetry::{LogConfig, LogFormat, LogTarget};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error::{KernelError, KernelResult};
use crate::paths::DaemonPaths;
use crate::scripting_bridge::OsascriptBridge;
use crate::{admin, lock, wiring};

/// Knobs the entry binary controls that do not belong in the persisted
/// configuration file.
#[derive(Default)]
pub struct StartupOptions {
    /// Workspace-local config layer, if the caller is running from inside a
    /// project directory (`courier_config::ConfigPaths::discover`).
    pub workspace: Option<PathBuf>,
}

const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// Load configuration, acquire the lock, and run the daemon until a signal
/// (or `shutdown_requested`, in tests) requests a cooperative stop.
///
/// The only fatal startup failures are configuration errors and the
/// single-instance lock already being held; everything past
/// that point is logged and degrades gracefully.
pub async fn run(options: StartupOptions) -> KernelResult<()> {
    let config_paths = courier_config::ConfigPaths::discover(options.workspace)?;
    let config = Arc::new(courier_config::load(&config_paths)?);

    let paths = DaemonPaths::resolve()?;
    paths.ensure()?;

    let log_config = LogConfig::new("info")
        .with_format(LogFormat::Compact)
        .with_target(LogTarget::RollingFile {
            directory: paths.log_dir(),
            prefix: "courier".to_string(),
        });
    let _log_guard = courier_telemetry::setup_logging(&log_config)?;

    lock::acquire(&paths)?;
    let result = run_with_lock(config, paths.clone()).await;
    lock::release(&paths);
    result
}

async fn run_with_lock(config: Arc<Config>, paths: DaemonPaths) -> KernelResult<()> {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(paths.db_file())?);
    let fingerprints = Arc::new(FingerprintCache::new(Duration::from_secs(config.channels.fingerprint_window_secs)));
    let scripting = Arc::new(OsascriptBridge::new(Duration::from_secs(config.timeouts.scripting_call_secs)));
    let connector = Arc::new(SubprocessConnector::new(config.connector.clone()));
    let events = EventBus::new();

    let egress = wiring::build_egress_registry(&config, &fingerprints, &scripting);
    let ctx = OrchestratorCtx::new(Arc::clone(&config), Arc::clone(&store), connector, egress, events, Arc::clone(&scripting));

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingress_adapters = wiring::build_ingress_adapters(&config, &store, &fingerprints, &scripting);
    wiring::spawn_ingress_pollers(ingress_adapters, inbound_tx.clone(), shutdown_rx.clone());

    let router_handle = tokio::spawn(courier_orchestrator::run_router(ctx.clone(), inbound_rx, shutdown_rx.clone()));
    let companion_handle = tokio::spawn(courier_orchestrator::run_companion_loop(ctx.clone(), shutdown_rx.clone()));
    let scheduler_handle = tokio::spawn(courier_orchestrator::run_scheduler(ctx.clone(), shutdown_rx.clone()));
    let ambient_handle = tokio::spawn(courier_orchestrator::run_ambient_scanner(ctx.clone(), shutdown_rx.clone()));

    let admin_handle = if config.http.enabled {
        let addr: std::net::SocketAddr = format!("{}:{}", config.http.host, config.http.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| KernelError::Http(e.to_string()))?;
        std::fs::write(paths.port_file(), config.http.port.to_string())?;
        let state = admin::AdminState::new(Arc::clone(&store), config.http.bearer_token.clone(), HttpIngress::new(inbound_tx));
        let mut admin_shutdown_rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            let shutdown = async move {
                let _ = admin_shutdown_rx.changed().await;
            };
            if let Err(e) = admin::serve(addr, state, shutdown).await {
                warn!(%e, "admin http surface exited with an error");
            }
        }))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping supervised tasks");
    let _ = shutdown_tx.send(true);
    ctx.connector.cancel_all();

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let joins = async {
        let _ = router_handle.await;
        let _ = companion_handle.await;
        let _ = scheduler_handle.await;
        let _ = ambient_handle.await;
        if let Some(handle) = admin_handle {
            let _ = handle.await;
        }
    };
    if tokio::time::timeout(grace, joins).await.is_err() {
        warn!("supervised tasks did not exit within the shutdown grace period");
    }

    Ok(())
}

/// Serve only the HTTP admin surface against the existing store — no
/// ingress pollers, no orchestrator, no connector. Used by `courier admin`
/// to administer an already-running daemon's database without competing
/// with it for the single-instance lock.
pub async fn run_admin_only(options: StartupOptions) -> KernelResult<()> {
    let config_paths = courier_config::ConfigPaths::discover(options.workspace)?;
    let config = courier_config::load(&config_paths)?;

    let paths = DaemonPaths::resolve()?;
    paths.ensure()?;

    let log_config = LogConfig::new("info").with_format(LogFormat::Compact);
    let _log_guard = courier_telemetry::setup_logging(&log_config)?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(paths.db_file())?);
    let (inbound_tx, _inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_CHANNEL_CAPACITY);

    let addr: std::net::SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .map_err(|e: std::net::AddrParseError| KernelError::Http(e.to_string()))?;
    let state = admin::AdminState::new(store, config.http.bearer_token.clone(), HttpIngress::new(inbound_tx));

    admin::serve(addr, state, wait_for_shutdown_signal()).await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(%e, "failed to install SIGTERM handler; only Ctrl-C will stop the daemon");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
