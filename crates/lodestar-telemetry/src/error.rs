//! Telemetry error types.

use lodestar_config::AccessError;
use thiserror::Error;

/// Errors that can occur during telemetry operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A logging setting had the wrong type.
    #[error("Invalid logging setting: {0}")]
    Access(#[from] AccessError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_config::ValueKind;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("failed".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: failed");
    }

    #[test]
    fn test_from_access_error() {
        let err: TelemetryError = AccessError::TypeMismatch {
            path: "logging.level".to_string(),
            requested: ValueKind::String,
            actual: ValueKind::Integer,
        }
        .into();
        assert!(matches!(err, TelemetryError::Access(_)));
        assert!(err.to_string().starts_with("Invalid logging setting: "));
    }
}
