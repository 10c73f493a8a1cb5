//! Error types for sortrace.
//!
//! All errors in sortrace are strongly typed using thiserror.
//! The engine itself never fails: algorithms assume well-formed input and
//! precondition violations are documented limitations, not raised errors.
//! Errors only exist at the two boundaries around it: configuration coming in,
//! and background execution coming back.

use thiserror::Error;

/// Configuration errors raised at the boundary before a run starts.
///
/// Degenerate numeric settings (speed, chunk size, queue depth) are clamped
/// rather than rejected, so this enum only covers values that cannot be repaired.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unknown algorithm '{name}'")]
    UnknownAlgorithm {
        name: String,
    },

    #[error("Algorithm '{algorithm}' is not eligible for background execution")]
    NotBackgroundEligible {
        algorithm: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Failed to read configuration from {path}: {message}")]
    ConfigRead {
        path: String,
        message: String,
    },
}

/// Execution errors that surface from a run in progress.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Background run failed: {message}")]
    Worker {
        message: String,
    },

    #[error("Channel disconnected on {path} path")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("No active run")]
    NoActiveRun,
}

/// Top-level error type for sortrace.
#[derive(Debug, Error)]
pub enum SortraceError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SortraceError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Always false: a failed background run must be restarted explicitly by
    /// the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type alias for sortrace operations.
pub type SortraceResult<T> = Result<T, SortraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_unknown_algorithm() {
        let err = ConfigurationError::UnknownAlgorithm {
            name: "bogo".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("bogo"));
        assert!(msg.contains("Unknown algorithm"));
    }

    #[test]
    fn test_configuration_error_not_eligible() {
        let err = ConfigurationError::NotBackgroundEligible {
            algorithm: "bubble".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("bubble"));
        assert!(msg.contains("background"));
    }

    #[test]
    fn test_execution_error_timeout() {
        let err = ExecutionError::Timeout { duration_ms: 5000 };
        let msg = format!("{err}");
        assert!(msg.contains("5000ms"));
    }

    #[test]
    fn test_execution_error_worker() {
        let err = ExecutionError::Worker {
            message: "boom".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Background run failed"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_sortrace_error_from_configuration() {
        let err: SortraceError = ConfigurationError::InvalidConfig {
            reason: "bad json".to_string(),
        }
        .into();
        assert!(err.is_configuration());
        assert!(!err.is_execution());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sortrace_error_from_execution() {
        let err: SortraceError = ExecutionError::Disconnected {
            path: "bridge".to_string(),
        }
        .into();
        assert!(err.is_execution());
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("bridge"));
    }

    #[test]
    fn test_sortrace_error_internal() {
        let err = SortraceError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(!err.is_retryable());
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
    }
}
