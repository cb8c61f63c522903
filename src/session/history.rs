//! Append-only attempt history for one session.

use chrono::{DateTime, Utc};

use crate::domain::{Attempt, Failure, Outcome};

/// Attempts of one session, oldest first. Entries are never changed once pushed.
#[derive(Debug, Default)]
pub struct AttemptHistory {
    attempts: Vec<Attempt>,
}

impl AttemptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new attempt; its index is assigned here (1-based).
    pub fn push(&mut self, code: String, outcome: Outcome, started_at: DateTime<Utc>, duration_ms: u64) -> &Attempt {
        let index = self.attempts.len() as u32 + 1;
        self.attempts.push(Attempt {
            index,
            code,
            outcome,
            started_at,
            duration_ms,
        });
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn len(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// The latest attempt together with its failure, if it failed.
    pub fn last_failure(&self) -> Option<(&Attempt, &Failure)> {
        let attempt = self.last()?;
        attempt.failure().map(|failure| (attempt, failure))
    }

    /// Whether the two most recent attempts both failed with the same signature.
    ///
    /// Only the last pair is compared; older attempts never count.
    pub fn repeats_previous(&self) -> bool {
        match self.attempts.as_slice() {
            [.., previous, latest] => match (previous.signature(), latest.signature()) {
                (Some(a), Some(b)) => {
                    log::debug!("history: comparing signatures {} vs {}", a.fingerprint(), b.fingerprint());
                    a == b
                }
                _ => false,
            },
            _ => false,
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn into_attempts(self) -> Vec<Attempt> {
        self.attempts
    }
}
