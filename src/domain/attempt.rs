//! Attempt records and execution outcomes.
//!
//! Every generate+execute iteration produces one `Attempt`. Attempts are
//! created once and never changed; the session appends them to its history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::signature::ErrorSignature;

/// Kind of error reported by an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Error class named by the interpreter (SyntaxError, NameError, ReferenceError, ...)
    Exception(String),
    /// Non-zero exit without a recognizable error class
    ExitStatus(i32),
    /// Process killed by a signal
    Signal,
    /// Execution exceeded its time budget
    Timeout,
}

impl ErrorKind {
    /// Get a human-readable name for the kind.
    pub fn as_str(&self) -> String {
        match self {
            ErrorKind::Exception(name) => name.clone(),
            ErrorKind::ExitStatus(code) => format!("ExitStatus({})", code),
            ErrorKind::Signal => "Signal".to_string(),
            ErrorKind::Timeout => "Timeout".to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// What went wrong.
    pub kind: ErrorKind,

    /// The error message, trimmed and free of harness paths.
    pub message: String,

    /// Full diagnostic output (traceback), for the correction prompt.
    pub detail: String,
}

impl Failure {
    /// Create a new failure with no extra detail.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: String::new(),
        }
    }

    /// Attach the full diagnostic output.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Failure for an execution that ran past its timeout.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(ErrorKind::Timeout, format!("execution timed out after {}ms", timeout_ms))
    }

    /// Comparable fingerprint of this failure.
    pub fn signature(&self) -> ErrorSignature {
        ErrorSignature::of(self)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Result of executing one code body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { stdout: String },
    Failure(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failure(failure) => Some(failure),
            Outcome::Success { .. } => None,
        }
    }
}

/// One generate+execute iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Position in the session (1-indexed).
    pub index: u32,

    /// Code the model produced.
    pub code: String,

    /// What happened when it ran.
    pub outcome: Outcome,

    /// When execution started.
    pub started_at: DateTime<Utc>,

    /// How long execution took in milliseconds.
    pub duration_ms: u64,
}

impl Attempt {
    pub fn failure(&self) -> Option<&Failure> {
        self.outcome.failure()
    }

    /// Signature of this attempt's failure, if it failed.
    pub fn signature(&self) -> Option<ErrorSignature> {
        self.failure().map(Failure::signature)
    }
}
