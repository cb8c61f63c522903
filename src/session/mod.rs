//! Debug sessions - the generate / execute / retry loop.
//!
//! A session owns its attempt history and state machine for the length of
//! one `DebugSession::run` call and returns a `SessionReport` when it reaches
//! a terminal state.

mod history;
mod observer;
mod runner;

use serde::{Deserialize, Serialize};

use crate::domain::{Attempt, SessionOutcome, TransitionRecord};

pub use history::AttemptHistory;
pub use observer::{LogObserver, SessionObserver};
pub use runner::DebugSession;

/// Default attempt cap
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Settings for a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stop after this many attempts even if errors keep changing
    pub max_iterations: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Attempts in order, oldest first
    pub attempts: Vec<Attempt>,
    pub transitions: Vec<TransitionRecord>,
}

impl SessionReport {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Code of the latest attempt, whatever its outcome.
    pub fn last_code(&self) -> Option<&str> {
        self.attempts.last().map(|a| a.code.as_str())
    }
}
