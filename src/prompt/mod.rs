//! Prompt System - Template rendering and prompt construction
//!
//! This module builds the text sent to the model: the initial request and
//! the correction request carrying the previous code and its error.

mod builder;
mod render;
mod templates;

pub use builder::{Prompt, PromptBuilder};
pub use render::PromptRenderer;
