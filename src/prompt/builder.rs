//! Prompt construction for initial generation and error correction.
//!
//! Building a prompt has no side effects: the same inputs always give the
//! same prompt. Nothing is truncated here; prompts that are too large are
//! rejected by the generator before the model is called.

use serde::Serialize;
use serde_json::json;

use super::render::PromptRenderer;
use super::templates;
use crate::domain::{Failure, Task, TaskKind};
use crate::error::Result;

const SYSTEM: &str = "system";
const INITIAL: &str = "initial";
const MODIFY: &str = "modify";
const CORRECTION: &str = "correction";

/// Text sent to the model for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Total characters across system and user text.
    pub fn len(&self) -> usize {
        self.system.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

/// Builds prompts from the registered templates.
pub struct PromptBuilder {
    renderer: PromptRenderer,
}

impl PromptBuilder {
    /// Create a builder with the built-in templates.
    pub fn new() -> Result<Self> {
        let mut renderer = PromptRenderer::new();
        renderer.register_template(SYSTEM, templates::SYSTEM)?;
        renderer.register_template(INITIAL, templates::INITIAL)?;
        renderer.register_template(MODIFY, templates::MODIFY)?;
        renderer.register_template(CORRECTION, templates::CORRECTION)?;
        Ok(Self { renderer })
    }

    /// Prompt for the first attempt of a session.
    pub fn build_initial_prompt(&self, task: &Task) -> Result<Prompt> {
        let language = task.language.tag();
        let user = match &task.kind {
            TaskKind::Generate { description } => self.renderer.render_named(
                INITIAL,
                &json!({
                    "language": language,
                    "fence": language,
                    "description": description,
                }),
            )?,
            TaskKind::Modify {
                existing_code,
                instruction,
            } => self.renderer.render_named(
                MODIFY,
                &json!({
                    "language": language,
                    "fence": language,
                    "existing_code": existing_code,
                    "instruction": instruction,
                }),
            )?,
        };

        Ok(Prompt {
            system: self.system_prompt(task)?,
            user,
        })
    }

    /// Prompt asking for a full replacement of `previous_code` that fixes `failure`.
    pub fn build_correction_prompt(&self, task: &Task, previous_code: &str, failure: &Failure) -> Result<Prompt> {
        let language = task.language.tag();
        let user = self.renderer.render_named(
            CORRECTION,
            &json!({
                "request": task.request(),
                "fence": language,
                "previous_code": previous_code,
                "error_kind": failure.kind.as_str(),
                "error_message": failure.message,
                "error_detail": failure.detail,
            }),
        )?;

        Ok(Prompt {
            system: self.system_prompt(task)?,
            user,
        })
    }

    fn system_prompt(&self, task: &Task) -> Result<String> {
        self.renderer
            .render_named(SYSTEM, &json!({ "language": task.language.tag() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CodeLanguage, ErrorKind};

    fn builder() -> PromptBuilder {
        PromptBuilder::new().unwrap()
    }

    fn syntax_error() -> Failure {
        Failure::new(
            ErrorKind::Exception("SyntaxError".to_string()),
            "Missing parentheses in call to 'print'. Did you mean print(...)?",
        )
        .with_detail("  File \"main.py\", line 1\n    print 'hello world'\nSyntaxError: Missing parentheses")
    }

    #[test]
    fn test_initial_prompt_contains_task() {
        let task = Task::generate("print hello world", CodeLanguage::Python);
        let prompt = builder().build_initial_prompt(&task).unwrap();

        assert!(prompt.user.contains("Implement a python script"));
        assert!(prompt.user.contains("print hello world"));
        assert!(prompt.user.contains("```python"));
        assert!(prompt.system.contains("python"));
        assert!(!prompt.is_empty());
    }

    #[test]
    fn test_modify_prompt_contains_existing_code() {
        let task = Task::modify("x = 1\nprint(x)", "print x twice", CodeLanguage::Python);
        let prompt = builder().build_initial_prompt(&task).unwrap();

        assert!(prompt.user.contains("Modify the following python code"));
        assert!(prompt.user.contains("x = 1\nprint(x)"));
        assert!(prompt.user.contains("print x twice"));
    }

    #[test]
    fn test_correction_prompt_contents() {
        let task = Task::generate("print hello world", CodeLanguage::Python);
        let prompt = builder()
            .build_correction_prompt(&task, "print 'hello world'", &syntax_error())
            .unwrap();

        assert!(prompt.user.contains("print hello world"));
        assert!(prompt.user.contains("print 'hello world'"));
        assert!(prompt.user.contains("SyntaxError"));
        assert!(prompt.user.contains("Missing parentheses in call to 'print'"));
        assert!(prompt.user.contains("Full error output"));
        assert!(prompt.user.contains("full corrected program"));
    }

    #[test]
    fn test_correction_prompt_without_detail() {
        let task = Task::generate("loop forever", CodeLanguage::Shell);
        let prompt = builder()
            .build_correction_prompt(&task, "while true; do :; done", &Failure::timeout(1000))
            .unwrap();

        assert!(prompt.user.contains("Timeout"));
        assert!(!prompt.user.contains("Full error output"));
        assert!(prompt.user.contains("```sh"));
    }

    #[test]
    fn test_correction_prompt_is_pure() {
        let task = Task::generate("print hello world", CodeLanguage::Python);
        let b = builder();
        let first = b
            .build_correction_prompt(&task, "print 'hello world'", &syntax_error())
            .unwrap();
        let second = b
            .build_correction_prompt(&task, "print 'hello world'", &syntax_error())
            .unwrap();
        assert_eq!(first, second);

        // A fresh builder gives the same text too
        let third = builder()
            .build_correction_prompt(&task, "print 'hello world'", &syntax_error())
            .unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn test_large_code_is_not_truncated() {
        let task = Task::generate("big", CodeLanguage::Python);
        let code = "x = 1\n".repeat(50_000);
        let prompt = builder()
            .build_correction_prompt(&task, &code, &syntax_error())
            .unwrap();
        assert!(prompt.user.contains(&code));
        assert!(prompt.len() > code.len());
    }

    #[test]
    fn test_code_is_not_html_escaped() {
        let task = Task::generate("compare", CodeLanguage::Python);
        let code = "if a < b and b > c: print(\"&\")";
        let prompt = builder().build_correction_prompt(&task, code, &syntax_error()).unwrap();
        assert!(prompt.user.contains(code));
    }
}
