//! Registry and plugin configuration.
//!
//! Configuration is read from TOML:
//!
//! ```toml
//! [registry]
//! unique_events = true
//! debug = false
//!
//! [plugin]
//! name = "$bus"
//! unique_name = false
//! ```
//!
//! Environment variables are a fallback, not an override: they only fill
//! registry fields the file left unset.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TIDINGS_UNIQUE_EVENTS` | `registry.unique_events` |
//! | `TIDINGS_DEBUG` | `registry.debug` |

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::plugin::PluginOptions;

/// Prefix shared by every supported environment variable.
pub const ENV_PREFIX: &str = "TIDINGS_";

/// Mapping from environment variable name to a `[registry]` key.
struct EnvMapping {
    var_name: &'static str,
    key: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TIDINGS_UNIQUE_EVENTS",
        key: "unique_events",
    },
    EnvMapping {
        var_name: "TIDINGS_DEBUG",
        key: "debug",
    },
];

/// Configuration of a single [`Registry`](crate::Registry).
///
/// Fixed at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Latch every event after its first emission.
    pub unique_events: bool,
    /// Write diagnostics for rejected input and no-op calls.
    pub debug: bool,
}

impl RegistryConfig {
    /// Configuration for a unique-events registry.
    #[must_use]
    pub fn unique() -> Self {
        Self {
            unique_events: true,
            debug: false,
        }
    }

    /// Enable or disable diagnostics.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Settings for registries created from this configuration.
    pub registry: RegistryConfig,
    /// Host plugin options.
    pub plugin: PluginOptions,
}

impl EventsConfig {
    /// Parse configuration from TOML, applying environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the text is not valid TOML or
    /// does not match the configuration schema.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        parse(text, "<string>", &collect_env_vars())
    }

    /// Load configuration from a single file, applying environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = parse(&text, &path.display().to_string(), &collect_env_vars())?;
        debug!(path = %path.display(), "loaded events config");
        Ok(config)
    }
}

/// Collect the `TIDINGS_*` environment variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .collect()
}

fn parse(text: &str, origin: &str, env_vars: &HashMap<String, String>) -> ConfigResult<EventsConfig> {
    let parse_err = |source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    };

    let mut merged: toml::Table = toml::from_str(text).map_err(parse_err)?;
    apply_env_fallbacks(&mut merged, env_vars);
    toml::Value::Table(merged).try_into().map_err(parse_err)
}

/// Fill unset `[registry]` keys from the environment.
fn apply_env_fallbacks(merged: &mut toml::Table, env_vars: &HashMap<String, String>) {
    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let Some(flag) = parse_flag(raw) else {
            warn!(var = mapping.var_name, value = %raw, "ignoring unparsable boolean");
            continue;
        };

        let registry = merged
            .entry("registry")
            .or_insert(toml::Value::Table(toml::Table::new()));
        let Some(table) = registry.as_table_mut() else {
            continue;
        };
        if !table.contains_key(mapping.key) {
            debug!(var = mapping.var_name, key = mapping.key, "applied env fallback");
            table.insert(mapping.key.to_owned(), toml::Value::Boolean(flag));
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PropertyName;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = parse("", "<test>", &HashMap::new()).unwrap();
        assert_eq!(config, EventsConfig::default());
        assert!(!config.registry.unique_events);
        assert!(!config.registry.debug);
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
            [registry]
            unique_events = true
            debug = true

            [plugin]
            name = "$bus"
            unique_name = false
        "#;
        let config = parse(text, "<test>", &HashMap::new()).unwrap();

        assert!(config.registry.unique_events);
        assert!(config.registry.debug);
        assert_eq!(config.plugin.name, PropertyName::Named("$bus".to_string()));
        assert_eq!(config.plugin.unique_name, PropertyName::Enabled(false));
    }

    #[test]
    fn test_env_is_fallback_only() {
        let text = "[registry]\nunique_events = false\n";
        let vars = env(&[("TIDINGS_UNIQUE_EVENTS", "true"), ("TIDINGS_DEBUG", "yes")]);
        let config = parse(text, "<test>", &vars).unwrap();

        // The file wins for keys it sets.
        assert!(!config.registry.unique_events);
        assert!(config.registry.debug);
    }

    #[test]
    fn test_env_without_registry_table() {
        let vars = env(&[("TIDINGS_UNIQUE_EVENTS", "1")]);
        let config = parse("", "<test>", &vars).unwrap();
        assert!(config.registry.unique_events);
    }

    #[test]
    fn test_unparsable_env_ignored() {
        let vars = env(&[("TIDINGS_DEBUG", "sometimes")]);
        let config = parse("", "<test>", &vars).unwrap();
        assert!(!config.registry.debug);
    }

    #[test]
    fn test_parse_error() {
        let result = parse("[registry\n", "<test>", &HashMap::new());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));

        let result = parse("[registry]\ndebug = \"loud\"\n", "<test>", &HashMap::new());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[registry]\nunique_events = true\ndebug = false").unwrap();

        let config = EventsConfig::load_file(file.path()).unwrap();
        assert!(config.registry.unique_events);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EventsConfig::load_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_registry_config_builders() {
        let config = RegistryConfig::unique().with_debug(true);
        assert!(config.unique_events);
        assert!(config.debug);
    }
}
