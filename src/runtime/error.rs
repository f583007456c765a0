//! Error types for the riftwatch runtime
//!
//! The tracking core never fails; these cover the edges where bytes come in
//! or sockets go out.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level runtime error
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Inbound event errors
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    /// Snapshot listener errors
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Inbound event decoding errors
#[derive(Debug, Error)]
pub enum EventError {
    /// Line is not a valid event
    #[error("Undecodable event `{line}`: {source}")]
    Decode {
        /// Offending line, truncated
        line: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Event source could not be read
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Snapshot listener lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Socket-level failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The accept loop ended abnormally
    #[error("Listener task failed: {0}")]
    Join(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for event decoding
pub type EventResult<T> = std::result::Result<T, EventError>;

/// Result type for the snapshot listener
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Convenience result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn read_events(path: &str) -> Result<()> {
        std::fs::File::open(path).map_err(EventError::from)?;
        Ok(())
    }

    #[test]
    fn test_errors_lift_into_runtime_error() {
        let err = read_events("/nonexistent/riftwatch/events.ndjson").unwrap_err();
        assert!(matches!(err, RuntimeError::Event(EventError::Io(_))));

        let err = RuntimeError::from(ConfigError::Invalid {
            field: "port",
            reason: "taken".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for port: taken"
        );
    }
}
