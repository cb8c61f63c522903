//! Debug loop states and legal transition guards.
//!
//! Every session starts at `Initializing` and ends in exactly one terminal
//! state. The session calls `advance()` to move between states; illegal
//! moves are rejected and every legal one is recorded.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Session created, task not yet handed over.
    Initializing,
    /// Building a prompt and waiting on the model.
    AwaitingGeneration,
    /// Running the generated code.
    Executing,
    /// Deciding what the latest outcome means.
    Evaluating,
    /// Failure that warrants another generation.
    Retrying,
    /// Code ran cleanly. Terminal.
    Succeeded,
    /// Two consecutive attempts failed the same way. Terminal.
    StoppedOnRepeatedError,
    /// Iteration cap reached. Terminal.
    StoppedOnMaxIterations,
    /// Caller cancelled the session. Terminal.
    Cancelled,
    /// A collaborator failed fatally (model, prompt size, executor). Terminal.
    Aborted,
}

impl LoopState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::StoppedOnRepeatedError | Self::StoppedOnMaxIterations | Self::Cancelled | Self::Aborted
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "Initializing",
            Self::AwaitingGeneration => "AwaitingGeneration",
            Self::Executing => "Executing",
            Self::Evaluating => "Evaluating",
            Self::Retrying => "Retrying",
            Self::Succeeded => "Succeeded",
            Self::StoppedOnRepeatedError => "StoppedOnRepeatedError",
            Self::StoppedOnMaxIterations => "StoppedOnMaxIterations",
            Self::Cancelled => "Cancelled",
            Self::Aborted => "Aborted",
        };
        write!(f, "{}", name)
    }
}

/// Legal transitions between loop states.
///
/// ```text
/// Initializing       → AwaitingGeneration
/// AwaitingGeneration → Executing | Aborted
/// Executing          → Evaluating | Aborted
/// Evaluating         → Succeeded | Retrying | StoppedOnRepeatedError | StoppedOnMaxIterations
/// Retrying           → AwaitingGeneration
/// (any non-terminal) → Cancelled
/// ```
fn is_legal_transition(from: LoopState, to: LoopState) -> bool {
    use LoopState::*;

    if to == Cancelled && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Initializing, AwaitingGeneration)
            | (AwaitingGeneration, Executing)
            | (AwaitingGeneration, Aborted)
            | (Executing, Evaluating)
            | (Executing, Aborted)
            | (Evaluating, Succeeded)
            | (Evaluating, Retrying)
            | (Evaluating, StoppedOnRepeatedError)
            | (Evaluating, StoppedOnMaxIterations)
            | (Retrying, AwaitingGeneration)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: LoopState,
    pub to: LoopState,
    /// Number of attempts recorded when the transition happened.
    pub attempt_count: u32,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal state transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: LoopState,
    pub to: LoopState,
}

/// The loop state machine. One per session.
pub struct StateMachine {
    current: LoopState,
    attempt_count: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine at `Initializing`.
    pub fn new() -> Self {
        Self {
            current: LoopState::Initializing,
            attempt_count: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> LoopState {
        self.current
    }

    /// Record how many attempts exist (stamped on later transitions).
    pub fn set_attempt_count(&mut self, count: u32) {
        self.attempt_count = count;
    }

    /// Move to `to`, or fail if the edge is not in the transition table.
    pub fn advance(&mut self, to: LoopState, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition { from: self.current, to });
        }

        log::debug!("state: {} -> {}{}", self.current, to, reason.map(|r| format!(" ({})", r)).unwrap_or_default());

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            attempt_count: self.attempt_count,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(str::to_string),
        });
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, keeping only its transition log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }
}
