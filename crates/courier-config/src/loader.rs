//! Layered configuration loading.
//!
//! Simplified from the existing `astrid-config::loader` four-layer merge:
//! this crate keeps the same layer order (defaults → system → user →
//! workspace) but merges via plain `toml::Value` table overlay rather than
//! the existing field-provenance-tracked `deep_merge_tracking`, since this
//! daemon has no `config show --sources` surface to justify that machinery.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use std::path::{Path, PathBuf};

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Where each layer's config file lives, in override order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// System-wide config, e.g. `/etc/courier/config.toml`.
    pub system: PathBuf,
    /// Per-user config, e.g. `~/.config/courier/config.toml`.
    pub user: PathBuf,
    /// An optional workspace-local override, e.g. `./.courier.toml`.
    pub workspace: Option<PathBuf>,
}

impl ConfigPaths {
    /// Resolve the standard system/user paths for this platform, with an
    /// optional workspace override supplied by the caller (typically via
    /// `--workspace` on the CLI).
    pub fn discover(workspace: Option<PathBuf>) -> ConfigResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "courier")
            .ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self {
            system: PathBuf::from("/etc/courier/config.toml"),
            user: dirs.config_dir().join("config.toml"),
            workspace,
        })
    }
}

/// Load and merge every layer, returning the fully resolved [`Config`].
///
/// Missing files in any layer are silently skipped (a fresh install has
/// neither a system nor a user config file); a present-but-unparsable file
/// is a hard error.
pub fn load(paths: &ConfigPaths) -> ConfigResult<Config> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).expect("embedded defaults.toml must be valid TOML");

    for path in [
        Some(paths.system.as_path()),
        Some(paths.user.as_path()),
        paths.workspace.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        if let Some(layer) = read_layer(path)? {
            deep_merge(&mut merged, layer);
        }
    }

    let config: Config = merged
        .try_into()
        .map_err(|source| ConfigError::Parse {
            path: paths.user.clone(),
            source,
        })?;
    validate(&config)?;
    Ok(config)
}

/// Load with no system/user/workspace files at all — the embedded defaults
/// only. Used by tests and by `courier config show --defaults`.
#[must_use]
pub fn load_defaults() -> Config {
    toml::from_str(DEFAULTS_TOML).expect("embedded defaults.toml must be valid TOML")
}

fn read_layer(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let value: toml::Value = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

/// Overlay `patch` onto `base` table-by-table; scalars and arrays in `patch`
/// replace `base` wholesale, nested tables merge recursively.
fn deep_merge(base: &mut toml::Value, patch: toml::Value) {
    match (base, patch) {
        (toml::Value::Table(base_table), toml::Value::Table(patch_table)) => {
            for (key, patch_value) in patch_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, patch_value),
                    None => {
                        base_table.insert(key, patch_value);
                    }
                }
            }
        }
        (base_slot, patch_value) => *base_slot = patch_value,
    }
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.http.enabled && config.http.port == 0 {
        return Err(ConfigError::Invalid(
            "http.port must be nonzero when http.enabled is true".to_string(),
        ));
    }
    if config.trigger_tag.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "trigger_tag must not be empty".to_string(),
        ));
    }
    if config.workspace.aliases.is_empty() {
        tracing::warn!("no workspace aliases configured; connector will have no writable path");
    }
    if let Some(default_alias) = &config.workspace.default_alias {
        let known = config
            .workspace
            .aliases
            .iter()
            .any(|alias| &alias.name == default_alias);
        if !known {
            return Err(ConfigError::Invalid(format!(
                "workspace.default_alias {default_alias:?} does not match any workspace.aliases entry"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_alone_parse_and_validate() {
        let config = load_defaults();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn workspace_layer_overrides_user_layer() {
        let dir = tempfile::tempdir().unwrap();
        let user_path = dir.path().join("user.toml");
        let workspace_path = dir.path().join("workspace.toml");
        std::fs::write(&user_path, "trigger_tag = \"!!user\"\n").unwrap();
        std::fs::write(&workspace_path, "trigger_tag = \"!!workspace\"\n").unwrap();

        let paths = ConfigPaths {
            system: dir.path().join("nonexistent-system.toml"),
            user: user_path,
            workspace: Some(workspace_path),
        };
        let config = load(&paths).unwrap();
        assert_eq!(config.trigger_tag, "!!workspace");
    }

    #[test]
    fn missing_layers_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths {
            system: dir.path().join("no-system.toml"),
            user: dir.path().join("no-user.toml"),
            workspace: None,
        };
        let config = load(&paths).unwrap();
        assert_eq!(config.trigger_tag, "!!agent");
    }

    #[test]
    fn unparsable_layer_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let user_path = dir.path().join("user.toml");
        let mut file = std::fs::File::create(&user_path).unwrap();
        writeln!(file, "not = [valid toml").unwrap();

        let paths = ConfigPaths {
            system: dir.path().join("no-system.toml"),
            user: user_path,
            workspace: None,
        };
        assert!(matches!(load(&paths), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn unknown_default_alias_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let user_path = dir.path().join("user.toml");
        std::fs::write(
            &user_path,
            "[workspace]\ndefault_alias = \"ghost\"\n",
        )
        .unwrap();
        let paths = ConfigPaths {
            system: dir.path().join("no-system.toml"),
            user: user_path,
            workspace: None,
        };
        assert!(matches!(load(&paths), Err(ConfigError::Invalid(_))));
    }
}
