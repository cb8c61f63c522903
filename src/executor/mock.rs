//! Scripted executor for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CodeExecutor, ExecutorError};
use crate::domain::{CodeLanguage, ErrorKind, Failure, Outcome};

/// Executor that replays scripted outcomes in order and records the code it was given.
#[derive(Default)]
pub struct MockCodeExecutor {
    outcomes: Mutex<VecDeque<Result<Outcome, ExecutorError>>>,
    executed: Mutex<Vec<String>>,
}

impl MockCodeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful run
    pub fn with_success(self, stdout: impl Into<String>) -> Self {
        self.push(Ok(Outcome::Success { stdout: stdout.into() }));
        self
    }

    /// Queue a failed run
    pub fn with_failure(self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.push(Ok(Outcome::Failure(Failure::new(kind, message))));
        self
    }

    /// Queue a failure raised as a named exception
    pub fn with_exception(self, name: &str, message: impl Into<String>) -> Self {
        self.with_failure(ErrorKind::Exception(name.to_string()), message)
    }

    /// Queue an arbitrary outcome
    pub fn with_outcome(self, outcome: Outcome) -> Self {
        self.push(Ok(outcome));
        self
    }

    /// Queue a harness error
    pub fn with_error(self, error: ExecutorError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, outcome: Result<Outcome, ExecutorError>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Number of executions so far
    pub fn call_count(&self) -> usize {
        self.executed.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Code bodies received, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CodeExecutor for MockCodeExecutor {
    async fn execute(&self, code: &str, _language: &CodeLanguage) -> Result<Outcome, ExecutorError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(code.to_string());
        }
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front())
            .unwrap_or_else(|| Err(ExecutorError::Unavailable("mock: no scripted outcomes left".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_and_records() {
        let executor = MockCodeExecutor::new()
            .with_exception("SyntaxError", "invalid syntax")
            .with_success("ok\n");

        let first = executor.execute("print(", &CodeLanguage::Python).await.unwrap();
        assert_eq!(first.failure().unwrap().kind, ErrorKind::Exception("SyntaxError".into()));

        let second = executor.execute("print('ok')", &CodeLanguage::Python).await.unwrap();
        assert!(second.is_success());

        let third = executor.execute("x", &CodeLanguage::Python).await;
        assert!(matches!(third, Err(ExecutorError::Unavailable(_))));

        assert_eq!(executor.call_count(), 3);
        assert_eq!(executor.executed(), vec!["print(", "print('ok')", "x"]);
    }
}
