//! Session event callbacks.

use crate::domain::{Attempt, Task};

use super::SessionReport;

/// Receives progress events from a running session.
///
/// Observers only watch; nothing they do changes the loop's decisions.
pub trait SessionObserver: Send + Sync {
    /// Called before asking the model for attempt `index`.
    fn on_generating(&self, _task: &Task, _index: u32) {}

    /// Called once an attempt has been executed and recorded.
    fn on_attempt(&self, _task: &Task, _attempt: &Attempt) {}

    /// Called once with the final report.
    fn on_finished(&self, _task: &Task, _report: &SessionReport) {}
}

/// Observer that logs each event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_generating(&self, task: &Task, index: u32) {
        log::info!("session: generating attempt {} ({})", index, task.language);
    }

    fn on_attempt(&self, _task: &Task, attempt: &Attempt) {
        match attempt.failure() {
            None => log::info!("session: attempt {} succeeded in {}ms", attempt.index, attempt.duration_ms),
            Some(failure) => log::info!(
                "session: attempt {} failed [{}] {}",
                attempt.index,
                failure.signature().fingerprint(),
                failure
            ),
        }
    }

    fn on_finished(&self, _task: &Task, report: &SessionReport) {
        log::info!("session: finished: {}", report.outcome.summary());
    }
}
