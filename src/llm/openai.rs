//! OpenAI Chat Completions client
//!
//! Implements the LlmClient trait for `/v1/chat/completions` and compatible
//! servers. The system prompt goes first as a `system` message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::llm::client::{LlmClient, LlmError, classify_http_error};
use crate::llm::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_MODEL: &str = "gpt-4o";

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the OpenAI client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }
}

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client with an already-resolved API key
    pub fn with_api_key(api_key: String, config: OpenAiConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_ref().unwrap_or(&self.config.model).clone();
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system }));
        }
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages
        })
    }

    fn parse_response(&self, body: Value) -> Result<CompletionResponse, LlmError> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let content = choice["message"]["content"].as_str().unwrap_or_default().to_string();
        let stop_reason = StopReason::from_provider(choice["finish_reason"].as_str());
        let usage = Usage::new(
            body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        );

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        log::debug!("openai: complete model={}", self.config.model);
        let url = format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            log::debug!("openai: HTTP {} {}", status, error_body);
            return Err(classify_http_error(status.as_u16(), retry_after, error_body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        self.parse_response(body)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
