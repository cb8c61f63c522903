use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use catherder::domain::{Attempt, SessionOutcome, Task};
use catherder::executor::ProcessExecutor;
use catherder::generator::{CodeGenerator, LlmCodeGenerator};
use catherder::llm::{AnthropicClient, AnthropicConfig, LlmClient, OpenAiClient, OpenAiConfig};
use catherder::prompt::PromptBuilder;
use catherder::session::{DebugSession, LogObserver, SessionConfig, SessionObserver, SessionReport};
use catherder::storage::ScriptStore;

mod cli;
mod config;

use cli::Cli;
use cli::session_io::{describe, resolve_task};
use config::{Config, Provider};

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catherder")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("catherder.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Prints session progress to the terminal.
struct ConsoleObserver {
    verbose: bool,
}

impl SessionObserver for ConsoleObserver {
    fn on_generating(&self, _task: &Task, index: u32) {
        if index == 1 {
            println!("{}", "Generating code...".cyan());
        } else {
            println!("{} (attempt {})", "Asking for a fix...".cyan(), index);
        }
    }

    fn on_attempt(&self, _task: &Task, attempt: &Attempt) {
        if self.verbose {
            println!("{}\n{}", format!("--- attempt {} ---", attempt.index).dimmed(), attempt.code);
        }
        match attempt.failure() {
            None => println!("{} in {}ms", "Code executed successfully".green(), attempt.duration_ms),
            Some(failure) => println!("{} {}", "Error encountered:".red(), failure),
        }
    }
}

/// Resolve the API key: environment variable first, then the key file.
fn resolve_api_key(config: &Config) -> Result<String> {
    let env_name = config.llm.key_env();
    if let Ok(key) = std::env::var(env_name) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }
    if let Some(path) = &config.llm.api_key_file {
        let key = fs::read_to_string(path).context(format!("Failed to read API key file {}", path.display()))?;
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }
    bail!("No API key: set {} or llm.api_key_file in the config", env_name)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<i32> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let task = resolve_task(cli, &mut io::stdin().lock())?;
    println!("{} {}", "Language:".green(), describe(&task.language));

    let api_key = resolve_api_key(config)?;
    match config.llm.provider {
        Provider::Anthropic => {
            let mut llm_config = AnthropicConfig {
                max_tokens: config.llm.max_tokens,
                ..AnthropicConfig::default()
            };
            if let Some(model) = &config.llm.model {
                llm_config.model = model.clone();
            }
            if let Some(url) = &config.llm.base_url {
                llm_config.base_url = url.clone();
            }
            let llm = AnthropicClient::with_api_key(api_key, llm_config).context("Failed to create Anthropic client")?;
            run_with_client(Arc::new(llm), cli, config, task).await
        }
        Provider::OpenAi => {
            let mut llm_config = OpenAiConfig {
                max_tokens: config.llm.max_tokens,
                ..OpenAiConfig::default()
            };
            if let Some(model) = &config.llm.model {
                llm_config.model = model.clone();
            }
            if let Some(url) = &config.llm.base_url {
                llm_config.base_url = url.clone();
            }
            let llm = OpenAiClient::with_api_key(api_key, llm_config).context("Failed to create OpenAI client")?;
            run_with_client(Arc::new(llm), cli, config, task).await
        }
    }
}

async fn run_with_client<L: LlmClient + 'static>(llm: Arc<L>, cli: &Cli, config: &Config, task: Task) -> Result<i32> {
    info!("Using model {}", llm.model());
    let generator = Arc::new(LlmCodeGenerator::with_config(llm, config.llm.generator_config()));

    let store = if cli.no_save || !config.output.save_scripts {
        None
    } else {
        let dir = cli.output_dir.clone().unwrap_or_else(|| config.output.scripts_dir.clone());
        let mut store = ScriptStore::new(&dir).context(format!("Failed to create scripts dir {}", dir.display()))?;
        if let Some(history) = &config.output.history_file {
            store = store
                .with_history(history)
                .context(format!("Failed to open history file {}", history.display()))?;
        }
        Some(Arc::new(store))
    };

    if !task.language.is_executable() {
        return generate_once(generator.as_ref(), &task, store.as_deref()).await;
    }

    let session_config = SessionConfig {
        max_iterations: cli.iterations.unwrap_or(config.session.max_iterations),
    };
    let executor = Arc::new(ProcessExecutor::new(config.execution.executor_config()));
    let mut session = DebugSession::with_config(generator, executor, session_config)?
        .with_observer(Arc::new(LogObserver))
        .with_observer(Arc::new(ConsoleObserver {
            verbose: cli.is_verbose(),
        }));
    if let Some(store) = &store {
        session = session.with_observer(store.clone());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling session");
            ctrl_c.cancel();
        }
    });

    let report = session.run(&task, cancel).await.context("Session failed")?;
    print_report(&report, store.as_deref());
    Ok(exit_code(&report.outcome))
}

/// Languages we cannot run: ask once and save the result.
async fn generate_once<G: CodeGenerator>(generator: &G, task: &Task, store: Option<&ScriptStore>) -> Result<i32> {
    let prompt = PromptBuilder::new()?.build_initial_prompt(task)?;
    println!("{}", "Generating code...".cyan());
    let code = match generator.generate(&prompt, &task.language).await {
        Ok(code) => code,
        Err(e) => {
            println!("{} {}", "Generation failed:".red(), e);
            return Ok(2);
        }
    };

    println!("{}", code);
    if let Some(store) = store {
        let path = store
            .save("initial", &task.language, &code)
            .context("Failed to save generated code")?;
        println!("{} {}", "Saved:".green(), path.display());
    }
    Ok(0)
}

fn print_report(report: &SessionReport, store: Option<&ScriptStore>) {
    let summary = report.outcome.summary();
    match &report.outcome {
        SessionOutcome::Succeeded { final_code } => {
            println!("{} {}", "Done:".green().bold(), summary);
            println!("{}", final_code);
        }
        SessionOutcome::Cancelled => println!("{} {}", "Stopped:".yellow().bold(), summary),
        _ => println!("{} {}", "Stopped:".red().bold(), summary),
    }
    if let Some(store) = store {
        println!("{} {}", "Scripts saved in".dimmed(), store.dir().display());
    }
}

fn exit_code(outcome: &SessionOutcome) -> i32 {
    match outcome {
        SessionOutcome::Succeeded { .. } => 0,
        SessionOutcome::StoppedOnRepeatedError { .. } | SessionOutcome::StoppedOnMaxIterations { .. } => 1,
        SessionOutcome::Aborted { .. } => 2,
        SessionOutcome::Cancelled => 130,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    setup_logging(&level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let code = run_application(&cli, &config).await.context("Application failed")?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
