//! The debug loop: generate, execute, diagnose, retry.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::history::AttemptHistory;
use super::observer::SessionObserver;
use super::{SessionConfig, SessionReport};
use crate::domain::{FatalError, LoopState, SessionOutcome, StateMachine, Task};
use crate::error::{CatHerderError, Result};
use crate::executor::CodeExecutor;
use crate::generator::CodeGenerator;
use crate::prompt::PromptBuilder;

/// Drives one task to a terminal outcome.
///
/// All per-session state lives inside `run`, so one `DebugSession` can run
/// any number of sessions, including concurrently.
///
/// Each iteration:
/// 1. Builds the initial prompt, or a correction prompt from the last failure
/// 2. Asks the generator for a complete program
/// 3. Executes it and records the attempt
/// 4. Stops on success, on the same error twice in a row, or at the cap
pub struct DebugSession<G, E>
where
    G: CodeGenerator,
    E: CodeExecutor,
{
    generator: Arc<G>,
    executor: Arc<E>,
    prompts: PromptBuilder,
    observers: Vec<Arc<dyn SessionObserver>>,
    config: SessionConfig,
}

impl<G, E> DebugSession<G, E>
where
    G: CodeGenerator,
    E: CodeExecutor,
{
    pub fn new(generator: Arc<G>, executor: Arc<E>) -> Result<Self> {
        Self::with_config(generator, executor, SessionConfig::default())
    }

    /// Fails with `InvalidState` when the attempt cap is zero.
    pub fn with_config(generator: Arc<G>, executor: Arc<E>, config: SessionConfig) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(CatHerderError::InvalidState(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            generator,
            executor,
            prompts: PromptBuilder::new()?,
            observers: Vec::new(),
            config,
        })
    }

    /// Add an observer that is told about every attempt.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run `task` until it reaches a terminal state.
    ///
    /// Collaborator failures end the session as `Aborted` inside the report;
    /// an `Err` here means the loop itself is broken (template or state bug).
    pub async fn run(&self, task: &Task, cancel: CancellationToken) -> Result<SessionReport> {
        let mut machine = StateMachine::new();
        let mut history = AttemptHistory::new();

        log::info!(
            "session: starting {} task, max {} attempt(s)",
            task.language,
            self.config.max_iterations
        );
        machine.advance(LoopState::AwaitingGeneration, Some("task received"))?;

        let outcome = loop {
            if cancel.is_cancelled() {
                break SessionOutcome::Cancelled;
            }

            // AwaitingGeneration
            let prompt = match history.last_failure() {
                None => self.prompts.build_initial_prompt(task)?,
                Some((attempt, failure)) => self.prompts.build_correction_prompt(task, &attempt.code, failure)?,
            };
            let index = history.len() + 1;
            self.notify(|o| o.on_generating(task, index));

            let generated = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.generator.generate(&prompt, &task.language) => Some(result),
            };
            let code = match generated {
                None => break SessionOutcome::Cancelled,
                Some(Err(e)) => {
                    log::warn!("session: generation failed: {}", e);
                    break SessionOutcome::Aborted { error: e.into() };
                }
                Some(Ok(code)) if code.trim().is_empty() => {
                    break SessionOutcome::Aborted {
                        error: FatalError::MalformedResponse {
                            reason: "model returned empty code".to_string(),
                        },
                    };
                }
                Some(Ok(code)) => code,
            };
            machine.advance(LoopState::Executing, None)?;

            // Executing
            let started_at = Utc::now();
            let start = Instant::now();
            let executed = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.executor.execute(&code, &task.language) => Some(result),
            };
            let result = match executed {
                None => break SessionOutcome::Cancelled,
                Some(Err(e)) => {
                    log::warn!("session: executor failed: {}", e);
                    break SessionOutcome::Aborted { error: e.into() };
                }
                Some(Ok(result)) => result,
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let attempt = history.push(code, result, started_at, duration_ms);
            self.notify(|o| o.on_attempt(task, attempt));
            machine.set_attempt_count(history.len());
            machine.advance(LoopState::Evaluating, None)?;

            // Evaluating
            if let Some(attempt) = history.last().filter(|a| a.outcome.is_success()) {
                break SessionOutcome::Succeeded {
                    final_code: attempt.code.clone(),
                };
            }
            if history.repeats_previous() {
                let last_failure = history
                    .last_failure()
                    .map(|(_, failure)| failure.clone())
                    .ok_or_else(|| CatHerderError::InvalidState("repeat without failure".into()))?;
                break SessionOutcome::StoppedOnRepeatedError {
                    last_failure,
                    attempt_count: history.len(),
                };
            }
            if history.len() >= self.config.max_iterations {
                break SessionOutcome::StoppedOnMaxIterations {
                    attempt_count: history.len(),
                };
            }

            machine.advance(LoopState::Retrying, Some("new error"))?;
            machine.advance(LoopState::AwaitingGeneration, None)?;
        };

        let summary = outcome.summary();
        machine.advance(outcome.terminal_state(), Some(&summary))?;
        log::info!("session: {} after {} attempt(s)", machine.current(), history.len());

        let report = SessionReport {
            outcome,
            attempts: history.into_attempts(),
            transitions: machine.into_transitions(),
        };
        self.notify(|o| o.on_finished(task, &report));
        Ok(report)
    }

    fn notify(&self, event: impl Fn(&dyn SessionObserver)) {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }
}
