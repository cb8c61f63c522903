//! Code generation - turn a prompt into a program.
//!
//! `CodeGenerator` is the seam between the debug loop and the model. The
//! loop only sees code text or one of three errors; network retries,
//! backoff and response parsing all live behind this trait.

mod extract;
mod llm;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CodeLanguage, FatalError};
use crate::prompt::Prompt;

pub use extract::{CodeBlock, ExtractError, extract_code, fenced_blocks};
pub use llm::{GeneratorConfig, LlmCodeGenerator};

/// Why generation produced no code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Network, auth or rate-limit failure, after any retries.
    #[error("model unavailable after {attempts} attempt(s): {reason}")]
    ModelUnavailable { attempts: u32, reason: String },

    /// The model answered but no usable code could be extracted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The prompt does not fit in the model's input.
    #[error("prompt too large: ~{estimated_tokens} tokens, limit {limit}")]
    SizeExceeded { estimated_tokens: usize, limit: usize },
}

impl From<GenerateError> for FatalError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::ModelUnavailable { attempts, reason } => FatalError::ModelUnavailable { attempts, reason },
            GenerateError::MalformedResponse(reason) => FatalError::MalformedResponse { reason },
            GenerateError::SizeExceeded { estimated_tokens, limit } => {
                FatalError::SizeExceeded { estimated_tokens, limit }
            }
        }
    }
}

/// Produces code for a prompt.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Generate a complete program in `language` for `prompt`.
    async fn generate(&self, prompt: &Prompt, language: &CodeLanguage) -> Result<String, GenerateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_error_into_fatal() {
        let fatal: FatalError = GenerateError::MalformedResponse("no fenced code block".into()).into();
        assert_eq!(
            fatal,
            FatalError::MalformedResponse {
                reason: "no fenced code block".into()
            }
        );

        let fatal: FatalError = GenerateError::SizeExceeded {
            estimated_tokens: 10,
            limit: 5,
        }
        .into();
        assert!(matches!(fatal, FatalError::SizeExceeded { limit: 5, .. }));
    }

    #[test]
    fn test_generate_error_display() {
        let err = GenerateError::ModelUnavailable {
            attempts: 4,
            reason: "API error 503: overloaded".into(),
        };
        assert_eq!(
            err.to_string(),
            "model unavailable after 4 attempt(s): API error 503: overloaded"
        );
    }
}
