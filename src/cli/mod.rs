//! CLI module for catherder - argument parsing and task input.

pub mod commands;
pub mod session_io;

pub use commands::Cli;
