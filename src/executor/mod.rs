//! Code execution.
//!
//! A `CodeExecutor` runs one code body in isolation and reports an
//! `Outcome`. A failing program is an `Outcome::Failure`, not an error;
//! `ExecutorError` is reserved for the harness itself being unusable.

mod diagnose;
mod mock;
mod process;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CodeLanguage, FatalError, Outcome};

pub use diagnose::{diagnose, scrub_paths};
pub use mock::MockCodeExecutor;
pub use process::{ExecutorConfig, ProcessExecutor};

/// The harness could not run the code at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

impl From<ExecutorError> for FatalError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Unavailable(reason) => FatalError::ExecutorUnavailable { reason },
        }
    }
}

/// Runs code and reports what happened.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Execute `code` as a complete program in `language`.
    async fn execute(&self, code: &str, language: &CodeLanguage) -> Result<Outcome, ExecutorError>;
}
