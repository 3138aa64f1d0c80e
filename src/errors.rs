//! Error types for the chatrecall engine
//!
//! Only configuration problems and prefetcher invariant violations surface
//! to the caller. Recall and rerank failures are absorbed by each stage's
//! fallback policy and never escape the pipeline.

use thiserror::Error;

/// Main error type for the retrieval engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Prefetcher state machine transition errors
    #[error("Invalid prefetch transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Configuration rejected at load time
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Engine error: {0}")]
    Generic(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Convert anyhow errors to EngineError
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = EngineError::Config("final_top_k must be at least 1".to_string());
        assert!(err.to_string().contains("final_top_k"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = EngineError::InvalidTransition {
            from: "Idle".to_string(),
            to: "Prefetching".to_string(),
            reason: "prediction has not run".to_string(),
        };
        assert!(err.to_string().contains("Idle"));
        assert!(err.to_string().contains("Prefetching"));
    }
}
