//! LLM-backed code generator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::extract::extract_code;
use super::{CodeGenerator, GenerateError};
use crate::domain::CodeLanguage;
use crate::llm::{CompletionRequest, LlmClient, LlmError, StopReason, estimate_tokens};
use crate::prompt::Prompt;

/// Tokens held back from the context window on top of the output budget
const CONTEXT_SAFETY_BUFFER: usize = 1000;

/// Settings for `LlmCodeGenerator`.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Max tokens for the model's answer
    pub max_tokens: u32,
    /// Model context window in tokens
    pub context_limit_tokens: usize,
    /// Retries after the first call for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff sleep
    pub max_backoff: Duration,
    /// Time limit for one model call
    pub call_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8192,
            context_limit_tokens: 200_000,
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(30),
            call_timeout: Duration::from_secs(300),
        }
    }
}

impl GeneratorConfig {
    /// Input tokens available once the answer and buffer are reserved.
    pub fn input_budget(&self) -> usize {
        self.context_limit_tokens
            .saturating_sub(self.max_tokens as usize)
            .saturating_sub(CONTEXT_SAFETY_BUFFER)
    }

    /// Sleep before retry number `retry` (1-based).
    fn backoff(&self, retry: u32, error: &LlmError) -> Duration {
        let exponential = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        let wait = match error.retry_after() {
            Some(retry_after) if retry_after > exponential => retry_after,
            _ => exponential,
        };
        wait.min(self.max_backoff)
    }
}

/// Generates code by asking an LLM and extracting the fenced block.
pub struct LlmCodeGenerator<L: LlmClient> {
    llm: Arc<L>,
    config: GeneratorConfig,
}

impl<L: LlmClient> LlmCodeGenerator<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self::with_config(llm, GeneratorConfig::default())
    }

    pub fn with_config(llm: Arc<L>, config: GeneratorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Reject prompts that cannot fit, without calling the model.
    fn check_size(&self, prompt: &Prompt) -> Result<(), GenerateError> {
        let estimated_tokens = estimate_tokens(&prompt.system) + estimate_tokens(&prompt.user);
        let limit = self.config.input_budget();
        if estimated_tokens > limit {
            return Err(GenerateError::SizeExceeded { estimated_tokens, limit });
        }
        Ok(())
    }

    async fn call_once(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let request = CompletionRequest::new(prompt.system.clone())
            .with_user_message(prompt.user.clone())
            .with_max_tokens(self.config.max_tokens);

        let response = tokio::time::timeout(self.config.call_timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.config.call_timeout))??;

        if response.stop_reason == StopReason::MaxTokens {
            log::warn!(
                "generate: response hit max_tokens ({}); code may be cut off",
                self.config.max_tokens
            );
        }
        Ok(response.content)
    }
}

#[async_trait]
impl<L: LlmClient> CodeGenerator for LlmCodeGenerator<L> {
    async fn generate(&self, prompt: &Prompt, language: &CodeLanguage) -> Result<String, GenerateError> {
        self.check_size(prompt)?;

        let mut calls = 0u32;
        let content = loop {
            calls += 1;
            log::debug!("generate: call {} to {}", calls, self.llm.model());

            match self.call_once(prompt).await {
                Ok(content) => break content,
                Err(LlmError::ContextOverflow(reason)) => {
                    log::warn!("generate: provider rejected prompt size: {}", reason);
                    return Err(GenerateError::SizeExceeded {
                        estimated_tokens: estimate_tokens(&prompt.system) + estimate_tokens(&prompt.user),
                        limit: self.config.input_budget(),
                    });
                }
                Err(e @ (LlmError::InvalidResponse(_) | LlmError::Json(_))) => {
                    return Err(GenerateError::MalformedResponse(e.to_string()));
                }
                Err(e) if e.is_retryable() && calls <= self.config.max_retries => {
                    let wait = self.config.backoff(calls, &e);
                    log::warn!(
                        "generate: transient error on call {} ({}), retrying in {:?}",
                        calls,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    log::error!("generate: giving up after {} call(s): {}", calls, e);
                    return Err(GenerateError::ModelUnavailable {
                        attempts: calls,
                        reason: e.to_string(),
                    });
                }
            }
        };

        extract_code(&content, language).map_err(|e| GenerateError::MalformedResponse(e.to_string()))
    }
}
