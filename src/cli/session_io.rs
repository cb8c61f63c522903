//! Turn command-line input into a `Task`.

use eyre::{Context, Result, bail};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use catherder::domain::{CodeLanguage, Task};

use super::Cli;

/// Build the task described by the command line.
///
/// `input` is only read when `--modify` is given without `--instruction`.
pub fn resolve_task(cli: &Cli, input: &mut impl BufRead) -> Result<Task> {
    let language = cli.code_type.clone();

    if let Some(prompt) = &cli.prompt {
        let description = read_prompt(prompt)?;
        return Ok(Task::generate(description, language));
    }

    if let Some(path) = &cli.modify {
        let existing_code =
            fs::read_to_string(path).context(format!("Failed to read file to modify: {}", path.display()))?;
        let instruction = match &cli.instruction {
            Some(instruction) => instruction.clone(),
            None => ask_instruction(input)?,
        };
        if instruction.trim().is_empty() {
            bail!("A modification instruction is required");
        }
        return Ok(Task::modify(existing_code, instruction.trim(), language));
    }

    bail!("Either --prompt or --modify is required")
}

/// Prompt text, or the contents of the file it names.
fn read_prompt(prompt: &str) -> Result<String> {
    let path = Path::new(prompt);
    let text = if path.is_file() {
        log::info!("Reading prompt from {}", path.display());
        fs::read_to_string(path).context(format!("Failed to read prompt file: {}", path.display()))?
    } else {
        prompt.to_string()
    };
    if text.trim().is_empty() {
        bail!("Prompt is empty");
    }
    Ok(text.trim().to_string())
}

fn ask_instruction(input: &mut impl BufRead) -> Result<String> {
    print!("How should the file be modified? ");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read instruction")?;
    Ok(line.trim().to_string())
}

/// Language as given on the command line, for messages.
pub fn describe(language: &CodeLanguage) -> String {
    if language.is_executable() {
        language.to_string()
    } else {
        format!("{} (not executable, generated once)", language)
    }
}
