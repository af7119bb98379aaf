//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tidings_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use tidings_events::prelude::*;
//! use serde_json::{Value, json};
//!
//! let events = Registry::new(RegistryConfig::default());
//! let registration = events.on("saved", |_: &[Value]| Value::Null).unwrap();
//!
//! events.emit("saved", vec![json!("notes.md")]);
//! assert!(registration.unregister());
//! ```

// Registry
pub use crate::{Registry, RegistryConfig, WaitOptions};

// Registrations
pub use crate::{Handler, HandlerId, Registration, Subscription};

// History
pub use crate::{Action, Record};

// Native bridging
pub use crate::{NativeRoot, NativeTarget};

// Errors
pub use crate::{WaitError, WaitResult};
