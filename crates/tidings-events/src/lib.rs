//! Tidings Events - In-process event registry.
//!
//! This crate provides:
//! - A handler registry keyed by event name, with synchronous emission
//! - Unique (latched) events that replay their first emission to late handlers
//! - Bridging of native event sources through [`NativeTarget`]
//! - Awaiting events with an optional timeout
//! - An append-only history of every registry action
//! - A host plugin that shares registries under property names
//!
//! # Architecture
//!
//! A [`Registry`] owns a handler sequence per event name and a history of
//! [`Record`]s. In unique-events mode, whether an event "already happened" is
//! decided from the history alone, per event name and channel (native or
//! not). Clearing handlers never touches the history, so latches survive.
//!
//! Handlers run synchronously on the emitting thread, in registration order,
//! and may call back into the registry.
//!
//! # Example
//!
//! ```rust
//! use serde_json::{Value, json};
//! use tidings_events::{Registry, WaitOptions};
//!
//! # async fn example() {
//! let events = Registry::unique();
//!
//! // Emitted before anyone listens.
//! events.emit("ready", vec![json!("v1")]);
//!
//! // Late handlers still see the first emission.
//! let registration = events.on("ready", |args: &[Value]| args[0].clone()).unwrap();
//! assert_eq!(registration.replayed(), Some(&json!("v1")));
//!
//! let args = events.wait("ready", WaitOptions::new()).await.unwrap();
//! assert_eq!(args, Some(vec![json!("v1")]));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Write to the debug channel when the registry has diagnostics enabled.
macro_rules! diagnostic {
    ($config:expr, $($arg:tt)+) => {
        if $config.debug {
            tracing::debug!($($arg)+);
        }
    };
}

pub mod config;
pub mod prelude;

mod error;
mod handler;
mod native;
mod plugin;
mod record;
mod registry;
mod wait;

pub use config::{EventsConfig, RegistryConfig};
pub use error::{ConfigError, ConfigResult, WaitError, WaitResult};
pub use handler::{Handler, HandlerId, Registration, Subscription};
pub use native::{NativeListener, NativeRoot, NativeTarget};
pub use plugin::{
    DEFAULT_EVENTS_NAME, DEFAULT_UNIQUE_EVENTS_NAME, EventsPlugin, Host, PluginOptions,
    PropertyName,
};
pub use record::{Action, Record};
pub use registry::Registry;
pub use wait::WaitOptions;
