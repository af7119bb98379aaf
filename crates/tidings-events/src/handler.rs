//! Handlers, registration ids and subscription handles.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};
use uuid::Uuid;

use crate::native::NativeTarget;
use crate::record::{Action, Record};
use crate::registry::Shared;

/// A registered event handler.
///
/// Receives the emitted arguments and returns a value that is collected by
/// [`Registry::emit`](crate::Registry::emit). `Value::Null` stands for "no result".
pub type Handler = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Opaque identifier of a single registration.
///
/// Registering the same closure twice yields two distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(Uuid);

impl HandlerId {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Invoke a handler, isolating the caller from panics.
///
/// A panicking handler contributes `Value::Null`.
pub(crate) fn invoke(handler: &Handler, event: &str, args: &[Value]) -> Value {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(args))) {
        Ok(value) => value,
        Err(e) => {
            warn!(event = %event, error = ?e, "Event handler panicked");
            Value::Null
        },
    }
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub enum Registration {
    /// The handler was registered and will run on future emissions.
    Active(Subscription),
    /// The event was already latched: the handler ran immediately with the
    /// latched arguments and was not registered. Holds its return value.
    Replayed(Value),
}

impl Registration {
    /// Get the subscription, if the handler was registered.
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Active(sub) => Some(sub),
            Self::Replayed(_) => None,
        }
    }

    /// Convert into the subscription, if the handler was registered.
    #[must_use]
    pub fn into_subscription(self) -> Option<Subscription> {
        match self {
            Self::Active(sub) => Some(sub),
            Self::Replayed(_) => None,
        }
    }

    /// Get the value returned by a replayed handler.
    #[must_use]
    pub fn replayed(&self) -> Option<&Value> {
        match self {
            Self::Active(_) => None,
            Self::Replayed(value) => Some(value),
        }
    }

    /// Unregister the handler if it was registered.
    ///
    /// Returns `false` for replayed registrations, which have nothing to remove.
    pub fn unregister(&self) -> bool {
        self.subscription().is_some_and(Subscription::unregister)
    }
}

#[derive(Debug)]
enum Binding {
    Local(Weak<Shared>),
    Native {
        registry: Weak<Shared>,
        target: Weak<dyn NativeTarget>,
    },
}

/// Handle to a single registration.
///
/// Dropping the handle leaves the handler registered; call
/// [`Subscription::unregister`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: HandlerId,
    event: String,
    binding: Binding,
}

impl Subscription {
    pub(crate) fn local(registry: &Arc<Shared>, event: &str, id: HandlerId) -> Self {
        Self {
            id,
            event: event.to_owned(),
            binding: Binding::Local(Arc::downgrade(registry)),
        }
    }

    pub(crate) fn native(
        registry: &Arc<Shared>,
        target: Weak<dyn NativeTarget>,
        event: &str,
        id: HandlerId,
    ) -> Self {
        Self {
            id,
            event: event.to_owned(),
            binding: Binding::Native {
                registry: Arc::downgrade(registry),
                target,
            },
        }
    }

    /// Registration id.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Event name the handler is registered for.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Whether the handler listens on a native target.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.binding, Binding::Native { .. })
    }

    /// Remove this registration.
    ///
    /// Returns `true` if the handler was removed. Calling it again, after the
    /// event was cleared, or once the registry or native target is gone is a
    /// no-op returning `false`.
    pub fn unregister(&self) -> bool {
        match &self.binding {
            Binding::Local(registry) => registry
                .upgrade()
                .is_some_and(|shared| shared.remove_handler(&self.event, self.id)),
            Binding::Native { registry, target } => {
                let shared = registry.upgrade();
                let Some(target) = target.upgrade() else {
                    if let Some(shared) = &shared {
                        diagnostic!(
                            shared.config,
                            event = %self.event,
                            "Native target for '{}' no longer exists!",
                            self.event
                        );
                    }
                    return false;
                };
                if !target.unsubscribe(&self.event, self.id) {
                    trace!(event = %self.event, handler = %self.id, "Native handler already removed");
                    return false;
                }
                if let Some(shared) = shared {
                    shared.record(
                        Record::new(Action::Unregister, Some(&self.event))
                            .with_handler(self.id)
                            .native(true),
                    );
                }
                trace!(event = %self.event, handler = %self.id, "Native handler unregistered");
                true
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handler_ids_are_distinct() {
        assert_ne!(HandlerId::new(), HandlerId::new());
    }

    #[test]
    fn test_invoke_returns_handler_value() {
        let handler: Handler = Arc::new(|args: &[Value]| json!(args.len()));
        assert_eq!(invoke(&handler, "count", &[json!(1), json!(2)]), json!(2));
    }

    #[test]
    fn test_invoke_absorbs_panic() {
        let handler: Handler = Arc::new(|_: &[Value]| -> Value { panic!("boom") });
        assert_eq!(invoke(&handler, "explode", &[]), Value::Null);
    }

    #[test]
    fn test_replayed_registration() {
        let registration = Registration::Replayed(json!("done"));
        assert!(registration.subscription().is_none());
        assert_eq!(registration.replayed(), Some(&json!("done")));
        assert!(!registration.unregister());
        assert!(registration.into_subscription().is_none());
    }
}
