//! CLI handlers for the `courier config` subcommand.

use anyhow::{Context, Result};
use courier_config::ConfigPaths;

/// Show the fully resolved (defaults + system + user + workspace) configuration.
pub fn show_config(format: &str, section: Option<&str>) -> Result<()> {
    let paths = ConfigPaths::discover(std::env::current_dir().ok())?;
    let config = courier_config::load(&paths)?;

    let value = serde_json::to_value(&config).context("failed to serialize configuration")?;
    let selected = match section {
        Some(name) => value
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such config section: {name}"))?,
        None => value,
    };

    // TOML has no top-level scalar representation, so a narrowed section that
    // isn't itself a table (e.g. `--section trigger_tag`) is printed plain.
    let output = match (format, &selected) {
        ("json", _) => serde_json::to_string_pretty(&selected)?,
        (_, serde_json::Value::Object(_)) => toml::to_string_pretty(&selected)?,
        (_, other) => match other {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };
    println!("{output}");
    Ok(())
}

/// Set a single dotted-path key (e.g. `http.port`) in the per-user config
/// layer, then re-validate the full merged configuration.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let paths = ConfigPaths::discover(None)?;
    let mut user_layer: toml::Value = match std::fs::read_to_string(&paths.user) {
        Ok(raw) => raw.parse()?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            toml::Value::Table(toml::value::Table::new())
        },
        Err(err) => return Err(err.into()),
    };

    set_at_path(&mut user_layer, key, parse_scalar(value))?;

    if let Some(parent) = paths.user.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&paths.user, toml::to_string_pretty(&user_layer)?)?;

    // Re-validate against the full layered config so a bad value is caught
    // immediately rather than surfacing at the next daemon start.
    courier_config::load(&paths)?;
    println!("Set {key} = {value}");
    Ok(())
}

/// Validate the currently resolved configuration without starting anything.
pub fn validate_config() -> Result<()> {
    let paths = ConfigPaths::discover(std::env::current_dir().ok())?;
    courier_config::load(&paths)?;
    println!("Configuration is valid.");
    Ok(())
}

fn set_at_path(root: &mut toml::Value, dotted_key: &str, leaf: toml::Value) -> Result<()> {
    let mut segments: Vec<&str> = dotted_key.split('.').collect();
    let last = segments
        .pop()
        .ok_or_else(|| anyhow::anyhow!("empty config key"))?;

    let mut cursor = root;
    for segment in segments {
        let table = cursor
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("{dotted_key}: {segment} is not a table"))?;
        cursor = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    let table = cursor
        .as_table_mut()
        .ok_or_else(|| anyhow::anyhow!("{dotted_key}: parent is not a table"))?;
    table.insert(last.to_string(), leaf);
    Ok(())
}

/// Parse a CLI-supplied scalar string into the most specific `toml::Value`
/// it matches: bool, integer, float, then string as the fallback.
fn parse_scalar(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scalar_prefers_bool_then_int_then_float_then_string() {
        assert_eq!(parse_scalar("true"), toml::Value::Boolean(true));
        assert_eq!(parse_scalar("42"), toml::Value::Integer(42));
        assert_eq!(parse_scalar("3.5"), toml::Value::Float(3.5));
        assert_eq!(parse_scalar("hello"), toml::Value::String("hello".to_string()));
    }

    #[test]
    fn set_at_path_creates_intermediate_tables() {
        let mut root = toml::Value::Table(toml::value::Table::new());
        set_at_path(&mut root, "http.port", toml::Value::Integer(9000)).unwrap();
        assert_eq!(
            root.get("http").and_then(|t| t.get("port")),
            Some(&toml::Value::Integer(9000))
        );
    }
}
