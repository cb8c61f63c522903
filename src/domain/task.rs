//! Task and language types.
//!
//! A `Task` is what the user asked for. It is fixed for the whole session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of the code the model is asked to write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    #[default]
    Python,
    Shell,
    JavaScript,
    Ruby,
    /// Anything else (latex, html, ...). Generated and saved, never executed.
    Other(String),
}

impl CodeLanguage {
    /// Tag used on fenced code blocks and in config keys.
    pub fn tag(&self) -> &str {
        match self {
            CodeLanguage::Python => "python",
            CodeLanguage::Shell => "sh",
            CodeLanguage::JavaScript => "javascript",
            CodeLanguage::Ruby => "ruby",
            CodeLanguage::Other(tag) => tag,
        }
    }

    /// Fence tags the model may use for this language.
    pub fn fence_aliases(&self) -> Vec<&str> {
        match self {
            CodeLanguage::Python => vec!["python", "py", "python3"],
            CodeLanguage::Shell => vec!["sh", "bash", "shell", "zsh"],
            CodeLanguage::JavaScript => vec!["javascript", "js", "node"],
            CodeLanguage::Ruby => vec!["ruby", "rb"],
            CodeLanguage::Other(tag) => vec![tag.as_str()],
        }
    }

    /// File extension for saved scripts.
    pub fn extension(&self) -> &str {
        match self {
            CodeLanguage::Python => "py",
            CodeLanguage::Shell => "sh",
            CodeLanguage::JavaScript => "js",
            CodeLanguage::Ruby => "rb",
            CodeLanguage::Other(tag) => tag,
        }
    }

    /// Interpreter command used when the config does not override it.
    pub fn default_interpreter(&self) -> Option<Vec<String>> {
        let argv: &[&str] = match self {
            CodeLanguage::Python => &["python3"],
            CodeLanguage::Shell => &["sh"],
            CodeLanguage::JavaScript => &["node"],
            CodeLanguage::Ruby => &["ruby"],
            CodeLanguage::Other(_) => return None,
        };
        Some(argv.iter().map(|s| s.to_string()).collect())
    }

    /// Whether the debug loop can run code in this language.
    pub fn is_executable(&self) -> bool {
        !matches!(self, CodeLanguage::Other(_))
    }
}

impl FromStr for CodeLanguage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Ok(match lower.as_str() {
            "python" | "py" | "python3" => CodeLanguage::Python,
            "sh" | "bash" | "shell" => CodeLanguage::Shell,
            "javascript" | "js" | "node" => CodeLanguage::JavaScript,
            "ruby" | "rb" => CodeLanguage::Ruby,
            _ => CodeLanguage::Other(lower),
        })
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// What the user wants built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    /// Write new code from a description
    Generate { description: String },
    /// Change an existing code body according to an instruction
    Modify { existing_code: String, instruction: String },
}

/// A task for one debugging session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub language: CodeLanguage,
}

impl Task {
    /// Create a task to write new code.
    pub fn generate(description: impl Into<String>, language: CodeLanguage) -> Self {
        Self {
            kind: TaskKind::Generate {
                description: description.into(),
            },
            language,
        }
    }

    /// Create a task to modify existing code.
    pub fn modify(existing_code: impl Into<String>, instruction: impl Into<String>, language: CodeLanguage) -> Self {
        Self {
            kind: TaskKind::Modify {
                existing_code: existing_code.into(),
                instruction: instruction.into(),
            },
            language,
        }
    }

    /// The user's own words: the description or the modification instruction.
    pub fn request(&self) -> &str {
        match &self.kind {
            TaskKind::Generate { description } => description,
            TaskKind::Modify { instruction, .. } => instruction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_str() {
        assert_eq!("python".parse::<CodeLanguage>().unwrap(), CodeLanguage::Python);
        assert_eq!("Py".parse::<CodeLanguage>().unwrap(), CodeLanguage::Python);
        assert_eq!("bash".parse::<CodeLanguage>().unwrap(), CodeLanguage::Shell);
        assert_eq!("node".parse::<CodeLanguage>().unwrap(), CodeLanguage::JavaScript);
        assert_eq!(
            "LaTeX".parse::<CodeLanguage>().unwrap(),
            CodeLanguage::Other("latex".to_string())
        );
    }

    #[test]
    fn test_language_extension() {
        assert_eq!(CodeLanguage::Python.extension(), "py");
        assert_eq!(CodeLanguage::Shell.extension(), "sh");
        assert_eq!(CodeLanguage::Other("html".to_string()).extension(), "html");
    }

    #[test]
    fn test_other_language_not_executable() {
        let latex = CodeLanguage::Other("latex".to_string());
        assert!(!latex.is_executable());
        assert!(latex.default_interpreter().is_none());
        assert!(CodeLanguage::Python.is_executable());
        assert_eq!(CodeLanguage::Python.default_interpreter(), Some(vec!["python3".to_string()]));
    }

    #[test]
    fn test_task_request() {
        let task = Task::generate("print hello world", CodeLanguage::Python);
        assert_eq!(task.request(), "print hello world");

        let task = Task::modify("print(1)", "print 2 instead", CodeLanguage::Python);
        assert_eq!(task.request(), "print 2 instead");
    }

    #[test]
    fn test_task_serialization() {
        let task = Task::modify("x = 1", "add y", CodeLanguage::Python);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["kind"]["type"], "modify");
        assert_eq!(json["language"], "python");
    }
}
