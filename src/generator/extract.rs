//! Pull the code out of a model response.
//!
//! The model is asked for one fenced block. We take the first closed block
//! tagged with the target language (or one of its aliases), else the first
//! closed block of any tag. A reply cut off inside a later block still
//! yields the earlier tagged one. When nothing usable is found the response
//! is malformed.

use crate::domain::CodeLanguage;

/// A fenced block found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lowercased info-string tag (may be empty).
    pub tag: String,
    pub body: String,
    /// False for a block still open at the end of the response.
    pub terminated: bool,
}

/// Why no code could be extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no fenced code block in response")]
    NoCodeBlock,

    #[error("code block is not terminated (response cut off?)")]
    Unterminated,

    #[error("code block is empty")]
    Empty,
}

/// Split a response into its fenced blocks, in order.
///
/// Only the last block can be unterminated.
pub fn fenced_blocks(content: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        match open.take() {
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    let tag = info.split_whitespace().next().unwrap_or("").to_lowercase();
                    open = Some((tag, Vec::new()));
                }
            }
            Some((tag, mut body)) => {
                if trimmed.trim_end() == "```" {
                    blocks.push(CodeBlock {
                        tag,
                        body: body.join("\n"),
                        terminated: true,
                    });
                } else {
                    body.push(line);
                    open = Some((tag, body));
                }
            }
        }
    }

    if let Some((tag, body)) = open {
        blocks.push(CodeBlock {
            tag,
            body: body.join("\n"),
            terminated: false,
        });
    }
    blocks
}

/// Extract the program for `language` from a model response.
pub fn extract_code(content: &str, language: &CodeLanguage) -> Result<String, ExtractError> {
    let blocks = fenced_blocks(content);
    let aliases = language.fence_aliases();
    let mut closed = blocks.iter().filter(|b| b.terminated);

    let chosen = match closed.clone().find(|b| aliases.contains(&b.tag.as_str())) {
        Some(block) => block,
        None if blocks.iter().any(|b| !b.terminated) => return Err(ExtractError::Unterminated),
        None => closed.next().ok_or(ExtractError::NoCodeBlock)?,
    };

    if chosen.body.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(chosen.body.clone())
}
