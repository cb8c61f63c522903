//! CatHerder - an LLM generate / execute / retry loop
//!
//! CatHerder asks a language model for a program, runs it, and feeds any
//! error back to the model for a corrected version. It stops when the code
//! runs cleanly, when the same error shows up twice in a row, or when the
//! attempt cap is reached.

pub mod domain;
pub mod error;
pub mod executor;
pub mod generator;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod storage;

pub use error::{CatHerderError, Result};
