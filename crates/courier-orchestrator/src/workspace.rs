//! Resolves a `@alias` from parsed command text against the configured
//! workspace alias table.

use std::path::PathBuf;

use courier_config::WorkspaceConfig;

/// Resolve `alias` (as extracted by `courier-parser`) to its configured
/// directory, falling back to `config.default_alias` when `alias` is `None`.
///
/// Returns the alias name actually used (so callers can persist it back onto
/// a run) alongside the resolved path.
pub fn resolve(config: &WorkspaceConfig, alias: Option<&str>) -> Result<(String, PathBuf), String> {
    let wanted = alias
        .map(str::to_string)
        .or_else(|| config.default_alias.clone())
        .ok_or_else(|| "no workspace alias given and no default_alias configured".to_string())?;

    config
        .aliases
        .iter()
        .find(|a| a.name == wanted)
        .map(|a| (wanted.clone(), PathBuf::from(&a.path)))
        .ok_or_else(|| format!("unknown workspace alias \"{wanted}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_config::WorkspaceAlias;

    fn config() -> WorkspaceConfig {
        WorkspaceConfig {
            aliases: vec![
                WorkspaceAlias {
                    name: "work".to_string(),
                    path: "/home/user/work".to_string(),
                },
                WorkspaceAlias {
                    name: "home".to_string(),
                    path: "/home/user/personal".to_string(),
                },
            ],
            default_alias: Some("home".to_string()),
        }
    }

    #[test]
    fn explicit_alias_wins() {
        let (name, path) = resolve(&config(), Some("work")).unwrap();
        assert_eq!(name, "work");
        assert_eq!(path, PathBuf::from("/home/user/work"));
    }

    #[test]
    fn falls_back_to_default_alias() {
        let (name, path) = resolve(&config(), None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(path, PathBuf::from("/home/user/personal"));
    }

    #[test]
    fn unknown_alias_is_an_error() {
        assert!(resolve(&config(), Some("nope")).is_err());
    }

    #[test]
    fn no_alias_and_no_default_is_an_error() {
        let cfg = WorkspaceConfig {
            aliases: Vec::new(),
            default_alias: None,
        };
        assert!(resolve(&cfg, None).is_err());
    }
}
