use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catherder::executor::ExecutorConfig;
use catherder::generator::GeneratorConfig;
use catherder::session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub session: SessionSection,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Provider default when unset
    pub model: Option<String>,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    pub context_limit_tokens: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Environment variable holding the API key; provider default when unset
    pub api_key_env: Option<String>,
    /// File holding the API key, read when the variable is not set
    pub api_key_file: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: None,
            max_tokens: 8192,
            timeout_ms: 300000,
            context_limit_tokens: 200000,
            max_retries: 3,
            initial_backoff_ms: 1000,
            api_key_env: None,
            api_key_file: None,
            base_url: None,
        }
    }
}

impl LlmConfig {
    /// Name of the variable the API key is read from.
    pub fn key_env(&self) -> &str {
        match (&self.api_key_env, self.provider) {
            (Some(name), _) => name,
            (None, Provider::Anthropic) => "ANTHROPIC_API_KEY",
            (None, Provider::OpenAi) => "OPENAI_API_KEY",
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            max_tokens: self.max_tokens,
            context_limit_tokens: self.context_limit_tokens,
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            call_timeout: Duration::from_millis(self.timeout_ms),
            ..GeneratorConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub max_iterations: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_iterations: SessionConfig::default().max_iterations,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub timeout_ms: u64,
    /// Language tag -> interpreter argv, e.g. `python: [python3, -u]`
    pub interpreters: HashMap<String, Vec<String>>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            interpreters: HashMap::new(),
        }
    }
}

impl ExecutionConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout_ms: self.timeout_ms,
            interpreters: self.interpreters.clone(),
            ..ExecutorConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub scripts_dir: PathBuf,
    pub save_scripts: bool,
    pub history_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            save_scripts: true,
            history_file: dirs::data_local_dir().map(|d| d.join("catherder").join("history.jsonl")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            session: SessionSection::default(),
            execution: ExecutionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.max_iterations == 0 {
            bail!("session.max_iterations must be at least 1");
        }
        if self.execution.timeout_ms == 0 {
            bail!("execution.timeout_ms must be greater than 0");
        }
        if self.llm.timeout_ms == 0 {
            bail!("llm.timeout_ms must be greater than 0");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than 0");
        }
        if let Some((tag, _)) = self.execution.interpreters.iter().find(|(_, argv)| argv.is_empty()) {
            bail!("execution.interpreters.{} must name a command", tag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.max_iterations, 5);
        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.llm.key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(config.output.scripts_dir, PathBuf::from("scripts"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "llm:\n  provider: openai\n  model: gpt-4o-mini\nsession:\n  max_iterations: 8\nexecution:\n  interpreters:\n    python: [python3, -u]\n",
        )
        .unwrap();

        assert_eq!(config.llm.provider, Provider::OpenAi);
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.llm.key_env(), "OPENAI_API_KEY");
        assert_eq!(config.llm.max_tokens, 8192);
        assert_eq!(config.session.max_iterations, 8);
        assert_eq!(config.execution.timeout_ms, 30000);
        assert_eq!(
            config.execution.interpreters.get("python"),
            Some(&vec!["python3".to_string(), "-u".to_string()])
        );
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.yml");
        fs::write(&path, "output:\n  save_scripts: false\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.output.save_scripts);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/definitely/not/here/catherder.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "session:\n  max_iterations: 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_interpreter() {
        let mut config = Config::default();
        config.execution.interpreters.insert("ruby".into(), Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generator_and_executor_configs() {
        let mut config = Config::default();
        config.llm.initial_backoff_ms = 250;
        config.llm.timeout_ms = 1000;
        config.execution.timeout_ms = 1500;

        let generator = config.llm.generator_config();
        assert_eq!(generator.initial_backoff, Duration::from_millis(250));
        assert_eq!(generator.call_timeout, Duration::from_secs(1));
        assert_eq!(config.execution.executor_config().timeout_ms, 1500);
    }
}
