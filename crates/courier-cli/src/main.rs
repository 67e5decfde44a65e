//! courier — command-line entry point for the courier daemon.
//!
//! A thin client over `courier-kernel`: `courier daemon` runs every
//! subsystem in the foreground, `courier admin` serves only the HTTP
//! surface, and the remaining subcommands are local utilities (config
//! read/write/validate, launchd service management, first-run setup).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod commands;
mod exit;

use clap::{Parser, Subcommand};
use courier_kernel::StartupOptions;

/// courier — a local-first personal assistant daemon.
#[derive(Parser)]
#[command(name = "courier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground: every channel, the orchestrator,
    /// and (if enabled) the HTTP admin surface.
    Daemon,

    /// Serve only the HTTP admin surface against the existing store.
    Admin,

    /// Interactive first-run configuration wizard.
    Setup,

    /// Print the version and exit.
    Version,

    /// Read, write, or validate the resolved configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Install, start, stop, and inspect the `launchd` user agent.
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the fully resolved configuration.
    Show {
        /// Output format: `toml` (default) or `json`.
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only a specific top-level section (e.g. `http`, `channels`).
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Set a single dotted-path key in the per-user config layer.
    Set {
        /// Dotted key, e.g. `http.port`.
        key: String,
        /// New value; parsed as bool, integer, float, then string.
        value: String,
    },
    /// Validate the resolved configuration without starting anything.
    Validate,
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Write and load the `launchd` user agent.
    Install,
    /// Unload and remove the `launchd` user agent.
    Uninstall,
    /// Ask launchd to start the daemon now.
    Start,
    /// Ask launchd to stop the daemon now.
    Stop,
    /// Report whether the daemon is currently running.
    Status,
    /// Print the tail of the daemon's most recent log file.
    Logs {
        /// Number of trailing lines to print.
        #[arg(short, long, default_value_t = 100)]
        lines: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Daemon => run_kernel(courier_kernel::run(StartupOptions::default())).await,
        Commands::Admin => run_kernel(courier_kernel::run_admin_only(StartupOptions::default())).await,
        Commands::Version => {
            println!("courier {}", env!("CARGO_PKG_VERSION"));
            0
        },
        Commands::Setup => run_local(commands::setup::run_setup()),
        Commands::Config { command } => run_local(match command {
            ConfigCommands::Show { format, section } => {
                commands::config::show_config(&format, section.as_deref())
            },
            ConfigCommands::Set { key, value } => commands::config::set_config(&key, &value),
            ConfigCommands::Validate => commands::config::validate_config(),
        }),
        Commands::Service { command } => run_local(match command {
            ServiceCommands::Install => commands::service::install(),
            ServiceCommands::Uninstall => commands::service::uninstall(),
            ServiceCommands::Start => commands::service::start(),
            ServiceCommands::Stop => commands::service::stop(),
            ServiceCommands::Status => commands::service::status(),
            ServiceCommands::Logs { lines } => commands::service::logs(lines),
        }),
    };

    std::process::exit(exit_code);
}

async fn run_kernel(result: impl std::future::Future<Output = courier_kernel::KernelResult<()>>) -> i32 {
    match result.await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("courier: {e}");
            exit::code_for_kernel_error(&e)
        },
    }
}

fn run_local(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("courier: {e}");
            match e.downcast_ref::<courier_config::ConfigError>() {
                Some(config_err) => exit::code_for_config_error(config_err),
                None => 2,
            }
        },
    }
}
