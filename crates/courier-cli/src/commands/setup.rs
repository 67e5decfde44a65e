//! `courier setup` — interactive first-run configuration wizard.
//!
//! Grounded on the existing `commands::onboarding::run_onboarding`
//! (`dialoguer` prompts themed with `ColorfulTheme`, `colored` banners),
//! narrowed to the handful of settings a courier install actually needs
//! before its first start: the sender allowlist, which channels are
//! enabled, and the connector command to invoke.
use anyhow::Result;
use colored::Colorize;
use courier_config::ConfigPaths;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};

/// Run the wizard, writing the answers to the per-user config layer.
pub fn run_setup() -> Result<()> {
    println!();
    println!("{}", "  Welcome to courier. Let's set up your daemon.".bold());
    println!();

    let theme = ColorfulTheme::default();

    let allowed: String = Input::with_theme(&theme)
        .with_prompt("Comma-separated senders allowed to reach the daemon (phone numbers, emails)")
        .allow_empty(true)
        .interact_text()?;

    let connector_command: String = Input::with_theme(&theme)
        .with_prompt("Connector command to spawn per turn")
        .default("claude".to_string())
        .interact_text()?;

    let chat_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the chat (iMessage) channel?")
        .default(true)
        .interact()?;
    let mail_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the Mail channel?")
        .default(false)
        .interact()?;
    let reminders_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the Reminders channel?")
        .default(false)
        .interact()?;
    let notes_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the Notes channel?")
        .default(false)
        .interact()?;
    let calendar_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the Calendar channel?")
        .default(false)
        .interact()?;

    let http_enabled = Confirm::with_theme(&theme)
        .with_prompt("Enable the HTTP admin surface?")
        .default(true)
        .interact()?;

    let mut senders = toml::value::Table::new();
    senders.insert(
        "allowed".to_string(),
        toml::Value::Array(
            allowed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        ),
    );

    let mut connector = toml::value::Table::new();
    connector.insert("command".to_string(), toml::Value::String(connector_command));

    let mut channels = toml::value::Table::new();
    channels.insert("chat_enabled".to_string(), toml::Value::Boolean(chat_enabled));
    channels.insert("mail_enabled".to_string(), toml::Value::Boolean(mail_enabled));
    channels.insert(
        "reminders_enabled".to_string(),
        toml::Value::Boolean(reminders_enabled),
    );
    channels.insert("notes_enabled".to_string(), toml::Value::Boolean(notes_enabled));
    channels.insert(
        "calendar_enabled".to_string(),
        toml::Value::Boolean(calendar_enabled),
    );

    let mut http = toml::value::Table::new();
    http.insert("enabled".to_string(), toml::Value::Boolean(http_enabled));

    let mut root = toml::value::Table::new();
    root.insert("senders".to_string(), toml::Value::Table(senders));
    root.insert("connector".to_string(), toml::Value::Table(connector));
    root.insert("channels".to_string(), toml::Value::Table(channels));
    root.insert("http".to_string(), toml::Value::Table(http));

    let paths = ConfigPaths::discover(None)?;
    if let Some(parent) = paths.user.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&paths.user, toml::to_string_pretty(&toml::Value::Table(root))?)?;

    // Validate the merged result so setup never leaves behind a config the
    // daemon would refuse to start with.
    courier_config::load(&paths)?;

    println!();
    println!("{}", format!("Wrote {}", paths.user.display()).green());
    println!("Run `courier daemon` to start.");
    Ok(())
}
