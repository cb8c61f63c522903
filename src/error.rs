//! Error types for CatHerder
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in CatHerder
#[derive(Debug, Error)]
pub enum CatHerderError {
    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Prompt template could not be rendered
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CatHerder operations
pub type Result<T> = std::result::Result<T, CatHerderError>;

impl From<crate::domain::IllegalTransition> for CatHerderError {
    fn from(err: crate::domain::IllegalTransition) -> Self {
        CatHerderError::InvalidState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_error() {
        let err = CatHerderError::InvalidState("Executing -> Succeeded".to_string());
        assert_eq!(err.to_string(), "Invalid state: Executing -> Succeeded");
    }

    #[test]
    fn test_prompt_error() {
        let err = CatHerderError::Prompt("unclosed tag".to_string());
        assert_eq!(err.to_string(), "Prompt error: unclosed tag");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CatHerderError = io_err.into();
        assert!(matches!(err, CatHerderError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_illegal_transition_conversion() {
        use crate::domain::{IllegalTransition, LoopState};
        let err: CatHerderError = IllegalTransition {
            from: LoopState::Executing,
            to: LoopState::Succeeded,
        }
        .into();
        assert!(matches!(err, CatHerderError::InvalidState(_)));
        assert!(err.to_string().contains("Executing -> Succeeded"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: CatHerderError = json_err.into();
        assert!(matches!(err, CatHerderError::Json(_)));
    }
}
