//! Domain types for CatHerder.
//!
//! Tasks, attempts and their outcomes, error signatures, loop states and
//! session outcomes.

mod attempt;
mod outcome;
mod signature;
mod state;
mod task;

pub use attempt::{Attempt, ErrorKind, Failure, Outcome};
pub use outcome::{FatalError, SessionOutcome};
pub use signature::{ErrorSignature, normalize_message};
pub use state::{IllegalTransition, LoopState, StateMachine, TransitionRecord};
pub use task::{CodeLanguage, Task, TaskKind};
