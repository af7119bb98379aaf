//! Tidings Telemetry - Logging setup for tidings event registries.
//!
//! Registries write their diagnostics through `tracing`. This crate installs
//! a `tracing-subscriber` pipeline with a configurable format, target and
//! filter so those diagnostics end up somewhere.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidings_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tidings_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_registry_diagnostics();
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    LogConfig, LogFormat, LogTarget, REGISTRY_DIAGNOSTICS_DIRECTIVE, setup_default_logging,
    setup_logging,
};
