//! Anthropic API client implementation
//!
//! This module implements the LlmClient trait for the Anthropic (Claude) Messages API.
//! A single call per `complete`; retry policy belongs to the caller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::llm::client::{LlmClient, LlmError, classify_http_error};
use crate::llm::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

/// Anthropic API base URL
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default max tokens
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }
}

impl AnthropicConfig {
    /// Create a new config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
    usage: Arc<Mutex<Usage>>,
}

impl AnthropicClient {
    /// Create a client with an already-resolved API key
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            config,
            usage: Arc::new(Mutex::new(Usage::default())),
        })
    }

    /// Build the request body for the Anthropic API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_ref().unwrap_or(&self.config.model).clone();
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": messages
        });

        if !request.system.is_empty() {
            body["system"] = json!(request.system);
        }

        body
    }

    /// Parse the API response into a CompletionResponse
    fn parse_response(&self, body: Value) -> Result<CompletionResponse, LlmError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("response has no content array".to_string()))?;

        let stop_reason = StopReason::from_provider(body["stop_reason"].as_str());

        let usage = body
            .get("usage")
            .map(|u| {
                Usage::new(
                    u["input_tokens"].as_u64().unwrap_or(0),
                    u["output_tokens"].as_u64().unwrap_or(0),
                )
            })
            .unwrap_or_default();

        if let Ok(mut total) = self.usage.lock() {
            total.add(&usage);
        }

        let mut content = String::new();
        for block in blocks {
            if block["type"].as_str() != Some("text") {
                continue;
            }
            if let Some(text) = block["text"].as_str() {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(text);
            }
        }

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage,
        })
    }

    /// Send a request to the Anthropic API
    async fn send_request(&self, body: Value) -> Result<Value, LlmError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
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
            let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::debug!("anthropic: HTTP {} {}", status, error_body);
            return Err(classify_http_error(status.as_u16(), retry_after, error_body));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Get cumulative token usage
    pub fn total_usage(&self) -> Usage {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        log::debug!("anthropic: complete model={}", self.config.model);
        let body = self.build_request(&request);
        let response = self.send_request(body).await?;
        self.parse_response(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// Keep the API key out of debug output
impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn client() -> AnthropicClient {
        AnthropicClient::with_api_key("test-key".to_string(), AnthropicConfig::default()).unwrap()
    }

    #[test]
    fn test_config_default() {
        let config = AnthropicConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.base_url, ANTHROPIC_BASE_URL);
    }

    #[test]
    fn test_config_with_model() {
        let config = AnthropicConfig::with_model("claude-3-haiku-20240307");
        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_client_with_api_key() {
        let client = client();
        assert!(client.is_ready());
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_build_request_basic() {
        let request = CompletionRequest::new("You are helpful").with_user_message("Hello");
        let body = client().build_request(&request);

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["system"], "You are helpful");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello");
    }

    #[test]
    fn test_build_request_without_system() {
        let request = CompletionRequest::new("")
            .with_user_message("Hello")
            .with_message(Message::assistant("Hi"));
        let body = client().build_request(&request);

        assert!(body.get("system").is_none());
        assert_eq!(body["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_build_request_custom_model_and_tokens() {
        let mut request = CompletionRequest::new("test").with_user_message("Hello").with_max_tokens(256);
        request.model = Some("claude-opus-4-5-20250514".to_string());

        let body = client().build_request(&request);

        assert_eq!(body["model"], "claude-opus-4-5-20250514");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let response = client()
            .parse_response(json!({
                "content": [
                    { "type": "text", "text": "Here is the script:" },
                    { "type": "text", "text": "```python\nprint('hi')\n```" }
                ],
                "stop_reason": "end_turn",
                "usage": { "input_tokens": 10, "output_tokens": 5 }
            }))
            .unwrap();

        assert_eq!(response.content, "Here is the script:\n```python\nprint('hi')\n```");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage, Usage::new(10, 5));
    }

    #[test]
    fn test_parse_response_without_content_is_invalid() {
        let result = client().parse_response(json!({ "type": "error" }));
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_response_stop_reasons() {
        let client = client();
        for (reason, expected) in [
            ("end_turn", StopReason::EndTurn),
            ("max_tokens", StopReason::MaxTokens),
            ("stop_sequence", StopReason::StopSequence),
            ("unknown", StopReason::EndTurn),
        ] {
            let response = client
                .parse_response(json!({
                    "content": [],
                    "stop_reason": reason,
                    "usage": { "input_tokens": 0, "output_tokens": 0 }
                }))
                .unwrap();
            assert_eq!(response.stop_reason, expected);
        }
    }

    #[test]
    fn test_total_usage_accumulation() {
        let client = client();
        for (input, output) in [(100, 50), (200, 100)] {
            client
                .parse_response(json!({
                    "content": [],
                    "stop_reason": "end_turn",
                    "usage": { "input_tokens": input, "output_tokens": output }
                }))
                .unwrap();
        }

        assert_eq!(client.total_usage(), Usage::new(300, 150));
    }

    #[test]
    fn test_debug_impl_hides_key() {
        let debug_str = format!("{:?}", client());
        assert!(debug_str.contains("AnthropicClient"));
        assert!(debug_str.contains(DEFAULT_MODEL));
        assert!(!debug_str.contains("test-key"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnthropicClient>();
    }

    #[test]
    fn test_empty_api_key_not_ready() {
        let client = AnthropicClient::with_api_key(String::new(), AnthropicConfig::default()).unwrap();
        assert!(!client.is_ready());
    }
}
