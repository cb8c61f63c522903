//! Session outcome types.
//!
//! Every session ends in exactly one `SessionOutcome`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::attempt::Failure;
use super::state::LoopState;

/// Collaborator failure that ends a session without retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FatalError {
    #[error("model unavailable after {attempts} attempt(s): {reason}")]
    ModelUnavailable { attempts: u32, reason: String },

    #[error("malformed model response: {reason}")]
    MalformedResponse { reason: String },

    #[error("prompt too large: ~{estimated_tokens} tokens, limit {limit}")]
    SizeExceeded { estimated_tokens: usize, limit: usize },

    #[error("executor unavailable: {reason}")]
    ExecutorUnavailable { reason: String },
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The latest code ran without error
    Succeeded { final_code: String },
    /// Two consecutive attempts failed with the same signature
    StoppedOnRepeatedError { last_failure: Failure, attempt_count: u32 },
    /// Iteration cap reached while errors kept changing
    StoppedOnMaxIterations { attempt_count: u32 },
    /// Caller cancelled the session
    Cancelled,
    /// A collaborator failed fatally
    Aborted { error: FatalError },
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Succeeded { .. })
    }

    /// The terminal loop state matching this outcome.
    pub fn terminal_state(&self) -> LoopState {
        match self {
            SessionOutcome::Succeeded { .. } => LoopState::Succeeded,
            SessionOutcome::StoppedOnRepeatedError { .. } => LoopState::StoppedOnRepeatedError,
            SessionOutcome::StoppedOnMaxIterations { .. } => LoopState::StoppedOnMaxIterations,
            SessionOutcome::Cancelled => LoopState::Cancelled,
            SessionOutcome::Aborted { .. } => LoopState::Aborted,
        }
    }

    /// Short one-line summary for logs and the console.
    pub fn summary(&self) -> String {
        match self {
            SessionOutcome::Succeeded { .. } => "code executed successfully".to_string(),
            SessionOutcome::StoppedOnRepeatedError {
                last_failure,
                attempt_count,
            } => format!(
                "same error twice in a row after {} attempt(s): {}",
                attempt_count, last_failure
            ),
            SessionOutcome::StoppedOnMaxIterations { attempt_count } => {
                format!("gave up after {} attempt(s) without success", attempt_count)
            }
            SessionOutcome::Cancelled => "cancelled".to_string(),
            SessionOutcome::Aborted { error } => format!("aborted: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn test_terminal_state_mapping() {
        assert_eq!(
            SessionOutcome::Succeeded {
                final_code: "x".into()
            }
            .terminal_state(),
            LoopState::Succeeded
        );
        assert_eq!(
            SessionOutcome::StoppedOnMaxIterations { attempt_count: 5 }.terminal_state(),
            LoopState::StoppedOnMaxIterations
        );
        assert_eq!(SessionOutcome::Cancelled.terminal_state(), LoopState::Cancelled);
        assert_eq!(
            SessionOutcome::Aborted {
                error: FatalError::MalformedResponse { reason: "x".into() }
            }
            .terminal_state(),
            LoopState::Aborted
        );
    }

    #[test]
    fn test_summary() {
        let outcome = SessionOutcome::StoppedOnRepeatedError {
            last_failure: Failure::new(ErrorKind::Exception("SyntaxError".into()), "invalid syntax"),
            attempt_count: 2,
        };
        assert_eq!(
            outcome.summary(),
            "same error twice in a row after 2 attempt(s): SyntaxError: invalid syntax"
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::SizeExceeded {
            estimated_tokens: 250_000,
            limit: 190_000,
        };
        assert_eq!(err.to_string(), "prompt too large: ~250000 tokens, limit 190000");

        let err = FatalError::ModelUnavailable {
            attempts: 4,
            reason: "API error 503".into(),
        };
        assert_eq!(err.to_string(), "model unavailable after 4 attempt(s): API error 503");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = SessionOutcome::StoppedOnMaxIterations { attempt_count: 5 };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "stopped_on_max_iterations");
        assert_eq!(json["attempt_count"], 5);
    }
}
