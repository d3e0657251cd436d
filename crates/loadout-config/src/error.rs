//! Error types for settings persistence and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file IO failed.
    #[error("settings io failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Settings file contents could not be parsed.
    #[error("settings parse failed")]
    Parse {
        /// Path of the unparseable document.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A settings value failed validation.
    #[error("invalid settings value")]
    Invalid {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional offending value.
        value: Option<String>,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn messages_stay_constant_with_context_in_fields() {
        let io_err = ConfigError::Io {
            operation: "read",
            path: PathBuf::from("settings.json"),
            source: io::Error::other("denied"),
        };
        assert_eq!(io_err.to_string(), "settings io failed");
        assert!(io_err.source().is_some());

        let invalid = ConfigError::Invalid {
            field: "poll_interval_secs",
            reason: "zero",
            value: Some("0".into()),
        };
        assert_eq!(invalid.to_string(), "invalid settings value");
        assert!(invalid.source().is_none());
    }
}
