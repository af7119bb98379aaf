//! The event registry: handler sequences, emission and history.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{trace, warn};

use crate::config::RegistryConfig;
use crate::handler::{Handler, HandlerId, Registration, Subscription, invoke};
use crate::record::{Action, Record};

/// One registration inside an event's handler sequence.
pub(crate) struct Entry {
    pub(crate) id: HandlerId,
    pub(crate) handler: Handler,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) handlers: HashMap<String, Vec<Entry>>,
    pub(crate) history: Vec<Record>,
}

impl State {
    /// Most recent emission of `event` on the given channel.
    pub(crate) fn last_emission(&self, event: &str, native: bool) -> Option<&Record> {
        self.history
            .iter()
            .rev()
            .find(|record| record.is_emission_of(event, native))
    }

    /// Arguments a new handler must be replayed with, if `event` is latched.
    pub(crate) fn latched_args(
        &self,
        config: &RegistryConfig,
        event: &str,
        native: bool,
    ) -> Option<Vec<Value>> {
        if !config.unique_events {
            return None;
        }
        self.last_emission(event, native)
            .map(|record| record.args.clone())
    }
}

/// State shared by every clone of a [`Registry`].
pub(crate) struct Shared {
    pub(crate) config: RegistryConfig,
    state: Mutex<State>,
}

impl Shared {
    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Registry state lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Validate an event name, reporting rejections on the debug channel.
    pub(crate) fn accepts(&self, event: &str) -> bool {
        if event.is_empty() {
            diagnostic!(self.config, "Registered event is not a string!");
            return false;
        }
        true
    }

    pub(crate) fn record(&self, record: Record) {
        self.state().history.push(record);
    }

    /// Remove one registration from `event`'s sequence.
    pub(crate) fn remove_handler(&self, event: &str, id: HandlerId) -> bool {
        let removed = {
            let mut state = self.state();
            let removed = state.handlers.get_mut(event).and_then(|entries| {
                let pos = entries.iter().position(|entry| entry.id == id)?;
                Some(entries.remove(pos))
            });
            if removed.is_some() {
                state
                    .history
                    .push(Record::new(Action::Unregister, Some(event)).with_handler(id));
            }
            removed
        };

        // Handler captures are dropped outside the lock so their destructors
        // may use the registry.
        match removed {
            Some(entry) => {
                drop(entry);
                trace!(event = %event, handler = %id, "Handler unregistered");
                true
            },
            None => {
                diagnostic!(
                    self.config,
                    event = %event,
                    "Handler for '{event}' is not registered!"
                );
                false
            },
        }
    }
}

/// In-process event registry.
///
/// A registry owns a handler sequence per event name and an append-only
/// history of every action. Cloning a registry is cheap and clones share the
/// same state, so many components can hold "the same" registry.
///
/// Handlers run synchronously on the emitting thread and never under an
/// internal lock, so they may freely call back into the registry.
///
/// # Example
///
/// ```rust
/// use serde_json::{Value, json};
/// use tidings_events::{Registry, RegistryConfig};
///
/// let registry = Registry::new(RegistryConfig::default());
/// registry.on("greet", |args: &[Value]| json!(format!("hello {}", args[0])));
///
/// let results = registry.emit("greet", vec![json!("world")]);
/// assert_eq!(results, vec![json!("hello \"world\"")]);
/// ```
#[derive(Clone)]
pub struct Registry {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("Registry")
            .field("config", &self.shared.config)
            .field("event_count", &state.handlers.len())
            .field("history_len", &state.history.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registry {
    /// Create a new registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Create a registry in unique-events mode.
    #[must_use]
    pub fn unique() -> Self {
        Self::new(RegistryConfig::unique())
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.shared.config
    }

    /// Register a handler for `event`.
    ///
    /// Returns `None` without side effects when `event` is empty.
    ///
    /// In unique-events mode, if `event` was already emitted, the handler is
    /// not registered: it runs immediately with the latched arguments and its
    /// return value comes back as [`Registration::Replayed`].
    pub fn on<F>(&self, event: &str, handler: F) -> Option<Registration>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.on_handler(event, Arc::new(handler))
    }

    /// Register an already shared handler.
    ///
    /// The same `Arc` may be registered several times; each registration is a
    /// separate entry with its own id.
    pub fn on_handler(&self, event: &str, handler: Handler) -> Option<Registration> {
        if !self.shared.accepts(event) {
            return None;
        }

        let mut state = self.shared.state();
        if let Some(args) = state.latched_args(&self.shared.config, event, false) {
            drop(state);
            diagnostic!(
                self.shared.config,
                event = %event,
                "Unique event '{event}' was already emitted, replaying!"
            );
            return Some(Registration::Replayed(invoke(&handler, event, &args)));
        }

        let id = HandlerId::new();
        state.handlers.entry(event.to_owned()).or_default().push(Entry {
            id,
            handler,
        });
        state
            .history
            .push(Record::new(Action::On, Some(event)).with_handler(id));
        drop(state);

        trace!(event = %event, handler = %id, "Handler registered");
        Some(Registration::Active(Subscription::local(&self.shared, event, id)))
    }

    /// Remove a registration by id.
    ///
    /// Returns `true` if it was found. Native registrations are removed
    /// through their [`Subscription`] instead.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let event = {
            let state = self.shared.state();
            state
                .handlers
                .iter()
                .find(|(_, entries)| entries.iter().any(|entry| entry.id == id))
                .map(|(event, _)| event.clone())
        };
        match event {
            Some(event) => self.shared.remove_handler(&event, id),
            None => {
                diagnostic!(self.shared.config, handler = %id, "Handler is not registered!");
                false
            },
        }
    }

    /// Emit `event`, invoking every registered handler in registration order.
    ///
    /// Returns the handlers' return values. An empty result is not an error:
    /// it means nothing fired, either because no handler is registered or
    /// because a unique event was already emitted.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Vec<Value> {
        if !self.shared.accepts(event) {
            return Vec::new();
        }

        let handlers: Vec<Handler> = {
            let mut state = self.shared.state();
            if self.shared.config.unique_events && state.last_emission(event, false).is_some() {
                drop(state);
                diagnostic!(
                    self.shared.config,
                    event = %event,
                    "Unique event '{event}' was already emitted!"
                );
                return Vec::new();
            }

            let handlers = state
                .handlers
                .entry(event.to_owned())
                .or_default()
                .iter()
                .map(|entry| Arc::clone(&entry.handler))
                .collect();
            state
                .history
                .push(Record::new(Action::Emit, Some(event)).with_args(args.clone()));
            handlers
        };

        if handlers.is_empty() {
            diagnostic!(
                self.shared.config,
                event = %event,
                "No event handlers registered for '{event}'!"
            );
            return Vec::new();
        }

        trace!(event = %event, handler_count = handlers.len(), "Emitting event");
        handlers
            .iter()
            .map(|handler| invoke(handler, event, &args))
            .collect()
    }

    /// Remove the handlers of one event, or of every event when `event` is `None`.
    ///
    /// History is kept, so unique events stay latched after a clear.
    pub fn clear<'a>(&self, event: impl Into<Option<&'a str>>) {
        let event = event.into();
        let removed: Vec<Vec<Entry>> = {
            let mut state = self.shared.state();
            let removed = match event {
                Some(name) => state.handlers.remove(name).into_iter().collect(),
                None => state.handlers.drain().map(|(_, entries)| entries).collect(),
            };
            state.history.push(Record::new(Action::Clear, event));
            removed
        };

        let count: usize = removed.iter().map(Vec::len).sum();
        drop(removed);
        trace!(event = ?event, removed = count, "Handlers cleared");
    }

    /// Snapshot of the history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Record> {
        self.shared.state().history.clone()
    }

    /// Number of handlers currently registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.shared
            .state()
            .handlers
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Whether `event` has been emitted on the given channel.
    ///
    /// In unique-events mode this is the latch that suppresses further
    /// emissions and triggers replay on registration.
    #[must_use]
    pub fn is_emitted(&self, event: &str, native: bool) -> bool {
        self.shared.state().last_emission(event, native).is_some()
    }
}
