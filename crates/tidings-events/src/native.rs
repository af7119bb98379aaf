//! Bridging events from native targets.
//!
//! A native target is any event source with its own subscription mechanism
//! (a window, a socket, a device). The registry only needs the
//! [`NativeTarget`] capability: subscribe a listener under an event name and
//! unsubscribe it again. [`NativeRoot`] is an in-process target and the
//! default used by [`Registry::native`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock, Weak};

use serde_json::Value;
use tracing::{trace, warn};

use crate::handler::{Handler, HandlerId, Registration, Subscription, invoke};
use crate::record::{Action, Record};
use crate::registry::{Registry, Shared};

/// Callback subscribed to a native target.
pub type NativeListener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// An external event source.
pub trait NativeTarget: Send + Sync {
    /// Start delivering `event` to `listener`.
    fn subscribe(&self, event: &str, id: HandlerId, listener: NativeListener);

    /// Stop delivering `event` to the listener registered under `id`.
    ///
    /// Returns `false` if no such listener exists.
    fn unsubscribe(&self, event: &str, id: HandlerId) -> bool;
}

static GLOBAL_ROOT: LazyLock<Arc<NativeRoot>> = LazyLock::new(|| Arc::new(NativeRoot::new()));

/// In-process native event target.
#[derive(Default)]
pub struct NativeRoot {
    listeners: RwLock<HashMap<String, Vec<(HandlerId, NativeListener)>>>,
}

impl std::fmt::Debug for NativeRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.listeners.read().map(|l| l.len()).unwrap_or_default();
        f.debug_struct("NativeRoot")
            .field("event_count", &count)
            .finish()
    }
}

impl NativeRoot {
    /// Create an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default target.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_ROOT)
    }

    /// Deliver `event` to every subscribed listener.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> usize {
        let listeners: Vec<NativeListener> = {
            let map = self.listeners.read().unwrap_or_else(|e| {
                warn!("NativeRoot read lock poisoned, recovering");
                e.into_inner()
            });
            map.get(event)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        trace!(event = %event, listener_count = listeners.len(), "Dispatching native event");
        for listener in &listeners {
            listener(args);
        }
        listeners.len()
    }

    /// Number of listeners subscribed to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .map(|map| map.get(event).map_or(0, Vec::len))
            .unwrap_or_default()
    }
}

impl NativeTarget for NativeRoot {
    fn subscribe(&self, event: &str, id: HandlerId, listener: NativeListener) {
        let mut map = self.listeners.write().unwrap_or_else(|e| {
            warn!("NativeRoot lock poisoned, recovering");
            e.into_inner()
        });
        map.entry(event.to_owned()).or_default().push((id, listener));
    }

    fn unsubscribe(&self, event: &str, id: HandlerId) -> bool {
        let removed = {
            let mut map = self.listeners.write().unwrap_or_else(|e| {
                warn!("NativeRoot lock poisoned, recovering");
                e.into_inner()
            });
            let Some(entries) = map.get_mut(event) else {
                return false;
            };
            let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) else {
                return false;
            };
            let removed = entries.remove(pos);
            if entries.is_empty() {
                map.remove(event);
            }
            removed
        };
        drop(removed);
        true
    }
}

/// Wrap `handler` so native deliveries are recorded and latched.
fn adapter(registry: Weak<Shared>, event: &str, id: HandlerId, handler: Handler) -> NativeListener {
    let event = event.to_owned();
    Arc::new(move |args: &[Value]| {
        let Some(shared) = registry.upgrade() else {
            trace!(event = %event, "Registry dropped, ignoring native event");
            return;
        };
        {
            let mut state = shared.state();
            if shared.config.unique_events && state.last_emission(&event, true).is_some() {
                return;
            }
            state.history.push(
                Record::new(Action::Emit, Some(&event))
                    .with_handler(id)
                    .with_args(args.to_vec())
                    .native(true),
            );
        }
        invoke(&handler, &event, args);
    })
}

impl Registry {
    /// Listen for `event` on the process-wide [`NativeRoot`].
    ///
    /// See [`Registry::native_on`].
    pub fn native<F>(&self, event: &str, handler: F) -> Option<Registration>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.native_on(event, handler, NativeRoot::global())
    }

    /// Listen for `event` on a native target.
    ///
    /// Each native delivery is recorded as a native emission before the
    /// handler runs. In unique-events mode only the first native delivery
    /// reaches handlers, and a handler registered after it runs immediately
    /// with its arguments instead of being subscribed.
    ///
    /// The latch is checked per listener. When several handlers for the same
    /// unique event are subscribed before its first native delivery, only the
    /// first to be called by the target runs; the others see the latch and
    /// never receive the arguments. Register one handler and fan out from it
    /// if every consumer must observe the event.
    ///
    /// The registry holds the target weakly: once the target is dropped,
    /// unregistering is a no-op.
    pub fn native_on<F>(
        &self,
        event: &str,
        handler: F,
        target: Arc<dyn NativeTarget>,
    ) -> Option<Registration>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        if !self.shared.accepts(event) {
            return None;
        }
        let handler: Handler = Arc::new(handler);

        let id = {
            let mut state = self.shared.state();
            if let Some(args) = state.latched_args(&self.shared.config, event, true) {
                drop(state);
                diagnostic!(
                    self.shared.config,
                    event = %event,
                    "Unique native event '{event}' was already emitted, replaying!"
                );
                return Some(Registration::Replayed(invoke(&handler, event, &args)));
            }
            let id = HandlerId::new();
            state.history.push(
                Record::new(Action::On, Some(event))
                    .with_handler(id)
                    .native(true),
            );
            id
        };

        target.subscribe(
            event,
            id,
            adapter(Arc::downgrade(&self.shared), event, id, handler),
        );
        trace!(event = %event, handler = %id, "Native handler registered");

        Some(Registration::Active(Subscription::native(
            &self.shared,
            Arc::downgrade(&target),
            event,
            id,
        )))
    }
}
