use thiserror::Error;

/// Error type for the gap pipeline and its adapters
///
/// Data-shape conditions (empty selections, thin samples, unknown stratum
/// labels in the table) are never errors; they surface as no-data outcomes.
/// Only configuration that cannot be honored fails here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Validation errors (e.g., mismatched column lengths in a builder)
    #[error("ValidationError: {0}")]
    ValidationError(String),
    /// Invalid per-call or file configuration (unknown selector, missing column)
    #[error("ConfigError: {0}")]
    ConfigError(String),
    /// Arrow-related errors (parsing, schema mismatch)
    #[error("ArrowError: {0}")]
    ArrowError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::ValidationError("test error".to_string());
        assert_eq!(err.to_string(), "ValidationError: test error");

        let err = AnalysisError::ConfigError("unknown education variable".to_string());
        assert_eq!(err.to_string(), "ConfigError: unknown education variable");

        let err = AnalysisError::ArrowError("arrow test".to_string());
        assert_eq!(err.to_string(), "ArrowError: arrow test");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<AnalysisError>();
        assert_sync::<AnalysisError>();
    }
}
