//! Storage for session artifacts: generated scripts and a JSONL attempt history.

mod jsonl;
mod scripts;

pub use jsonl::JsonlLog;
pub use scripts::ScriptStore;
