//! CLI definition using clap.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use catherder::domain::CodeLanguage;

/// CatHerder - generate code with an LLM, run it, and feed errors back until it works
#[derive(Parser, Debug)]
#[command(name = "catherder")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("task").required(true).args(["prompt", "modify"])))]
pub struct Cli {
    /// Optional config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to build: prompt text, or a path to a file containing it
    #[arg(short, long, value_name = "TEXT|FILE")]
    pub prompt: Option<String>,

    /// Existing file to modify
    #[arg(short, long, value_name = "FILE")]
    pub modify: Option<PathBuf>,

    /// How to modify the file (asked for on stdin if omitted)
    #[arg(long, requires = "modify")]
    pub instruction: Option<String>,

    /// Language of the generated code (python, sh, javascript, ruby, latex, ...)
    #[arg(short, long, default_value = "python")]
    pub code_type: CodeLanguage,

    /// Maximum attempts, at least 1 (overrides config)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,

    /// Directory for generated scripts (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write scripts to disk
    #[arg(long)]
    pub no_save: bool,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}
