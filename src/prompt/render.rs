//! Prompt Renderer - Render templates with context variables using Handlebars
//!
//! This module provides the PromptRenderer struct which uses Handlebars to
//! render prompt templates with context variables.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{CatHerderError, Result};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing fields are an error, not an empty string
        handlebars.set_strict_mode(true);
        // Code and tracebacks go through verbatim
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| CatHerderError::Prompt(format!("Failed to render template: {}", e)))
    }

    /// Register a named template for later use
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| CatHerderError::Prompt(format!("Failed to register template '{}': {}", name, e)))
    }

    /// Render a previously registered template
    pub fn render_named<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        self.handlebars
            .render(name, context)
            .map_err(|e| CatHerderError::Prompt(format!("Failed to render template '{}': {}", name, e)))
    }

    /// Check if a named template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.get_template(name).is_some()
    }
}
