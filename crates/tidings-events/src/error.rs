//! Error types for the event registry.

use std::io;

use thiserror::Error;

/// Failure of a [`Registry::wait`](crate::Registry::wait) call.
///
/// Invalid input and benign no-op conditions never surface as errors; a
/// timeout configured to reject is the only failure a caller observes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The timeout elapsed before the event was emitted.
    #[error("Timeout while waiting for event \"{event}\"!")]
    Timeout {
        /// Name of the event that was awaited.
        event: String,
    },
}

/// Result type for wait operations.
pub type WaitResult<T> = Result<T, WaitError>;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// Path to the config file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse config file at {path}: {source}")]
    ParseError {
        /// Path to the config file that failed to parse.
        path: String,
        /// Underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = WaitError::Timeout {
            event: "ready".to_string(),
        };
        assert_eq!(err.to_string(), "Timeout while waiting for event \"ready\"!");
    }

    #[test]
    fn test_read_error_display() {
        let err = ConfigError::ReadError {
            path: "/nope/tidings.toml".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/nope/tidings.toml"));
        assert!(msg.contains("missing"));
    }
}
