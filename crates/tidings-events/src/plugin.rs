//! Host integration.
//!
//! A host (an application framework, a component tree) exposes registries
//! to its instances under property names. [`EventsPlugin`] creates one
//! standard registry and one unique-events registry and attaches them to
//! every host it is installed into, so all instances share the same pair.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EventsConfig, RegistryConfig};
use crate::registry::Registry;

/// Default property name of the standard registry.
pub const DEFAULT_EVENTS_NAME: &str = "$events";

/// Default property name of the unique-events registry.
pub const DEFAULT_UNIQUE_EVENTS_NAME: &str = "$uniqueEvents";

/// Property name setting: `false` disables the registry, `true` keeps the
/// default name and a string overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyName {
    /// Use the default name (`true`) or skip attachment (`false`).
    Enabled(bool),
    /// Attach under this name.
    Named(String),
}

impl Default for PropertyName {
    fn default() -> Self {
        Self::Enabled(true)
    }
}

impl PropertyName {
    /// Resolve against `default`. Returns `None` when disabled.
    #[must_use]
    pub fn resolve<'a>(&'a self, default: &'a str) -> Option<&'a str> {
        match self {
            Self::Enabled(true) => Some(default),
            Self::Enabled(false) => None,
            Self::Named(name) => Some(name.as_str()),
        }
    }
}

/// Options of the host plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// Property name of the standard registry.
    pub name: PropertyName,
    /// Property name of the unique-events registry.
    #[serde(alias = "uniqueName")]
    pub unique_name: PropertyName,
}

/// Something registries can be attached to.
pub trait Host {
    /// Expose `registry` under `property`.
    fn attach(&mut self, property: &str, registry: Registry);
}

/// Shares a standard and a unique-events registry with hosts.
#[derive(Debug, Clone)]
pub struct EventsPlugin {
    bindings: Vec<(String, Registry)>,
}

impl EventsPlugin {
    /// Create the plugin and its registries.
    #[must_use]
    pub fn new(options: &PluginOptions) -> Self {
        Self::with_debug(options, false)
    }

    /// Create the plugin with diagnostics enabled or disabled on both registries.
    #[must_use]
    pub fn with_debug(options: &PluginOptions, debug: bool) -> Self {
        let standard = RegistryConfig::default().with_debug(debug);
        let unique = RegistryConfig::unique().with_debug(debug);

        let bindings = [
            (options.name.resolve(DEFAULT_EVENTS_NAME), standard),
            (options.unique_name.resolve(DEFAULT_UNIQUE_EVENTS_NAME), unique),
        ]
        .into_iter()
        .filter_map(|(name, config)| Some((name?.to_owned(), Registry::new(config))))
        .collect();

        Self { bindings }
    }

    /// Create the plugin from a loaded configuration.
    ///
    /// Only the `debug` flag of `[registry]` applies: the plugin always pairs
    /// a standard registry with a unique-events one.
    #[must_use]
    pub fn from_config(config: &EventsConfig) -> Self {
        Self::with_debug(&config.plugin, config.registry.debug)
    }

    /// Get the registry attached under `property`.
    #[must_use]
    pub fn registry(&self, property: &str) -> Option<&Registry> {
        self.bindings
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, registry)| registry)
    }

    /// Names the registries are attached under.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }

    /// Attach the registries to `host`.
    ///
    /// Returns the number of registries attached.
    pub fn install<H: Host + ?Sized>(&self, host: &mut H) -> usize {
        for (name, registry) in &self.bindings {
            host.attach(name, registry.clone());
            debug!(property = %name, "Registry attached to host");
        }
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Component {
        properties: HashMap<String, Registry>,
    }

    impl Host for Component {
        fn attach(&mut self, property: &str, registry: Registry) {
            self.properties.insert(property.to_owned(), registry);
        }
    }

    #[test]
    fn test_default_names() {
        let plugin = EventsPlugin::new(&PluginOptions::default());
        let mut component = Component::default();

        assert_eq!(plugin.install(&mut component), 2);
        assert!(component.properties.contains_key("$events"));
        assert!(
            component.properties["$uniqueEvents"]
                .config()
                .unique_events
        );
        assert!(!component.properties["$events"].config().unique_events);
    }

    #[test]
    fn test_disabled_and_renamed() {
        let options = PluginOptions {
            name: PropertyName::Named("$bus".to_string()),
            unique_name: PropertyName::Enabled(false),
        };
        let plugin = EventsPlugin::new(&options);
        let mut component = Component::default();

        assert_eq!(plugin.install(&mut component), 1);
        assert!(component.properties.contains_key("$bus"));
        assert!(!component.properties.contains_key("$events"));
        assert!(plugin.registry(DEFAULT_UNIQUE_EVENTS_NAME).is_none());
        assert_eq!(plugin.property_names().collect::<Vec<_>>(), vec!["$bus"]);
    }

    #[test]
    fn test_instances_share_registries() {
        let plugin = EventsPlugin::new(&PluginOptions::default());
        let mut first = Component::default();
        let mut second = Component::default();
        plugin.install(&mut first);
        plugin.install(&mut second);

        first.properties["$events"].on("ping", |_: &[Value]| json!("pong"));
        let results = second.properties["$events"].emit("ping", vec![]);
        assert_eq!(results, vec![json!("pong")]);
    }

    #[test]
    fn test_from_config() {
        let config = EventsConfig::from_toml_str(
            "[registry]\ndebug = true\n[plugin]\nname = false\n",
        )
        .unwrap();
        let plugin = EventsPlugin::from_config(&config);

        let names: Vec<_> = plugin.property_names().collect();
        assert_eq!(names, vec![DEFAULT_UNIQUE_EVENTS_NAME]);
        assert!(plugin.registry(DEFAULT_UNIQUE_EVENTS_NAME).unwrap().config().debug);
    }

    #[test]
    fn test_options_deserialize() {
        let options: PluginOptions =
            serde_json::from_str(r#"{"name": false, "uniqueName": "$once"}"#).unwrap();
        assert_eq!(options.name.resolve(DEFAULT_EVENTS_NAME), None);
        assert_eq!(
            options.unique_name.resolve(DEFAULT_UNIQUE_EVENTS_NAME),
            Some("$once")
        );

        let defaults: PluginOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, PluginOptions::default());
    }
}
