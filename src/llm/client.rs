//! Core LLM client trait, errors, and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model this client talks to
    fn model(&self) -> &str;

    /// Whether the client is configured well enough to make calls
    fn is_ready(&self) -> bool;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Context overflow: {0}")]
    ContextOverflow(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
            LlmError::ContextOverflow(_) => false,
        }
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Map a non-success HTTP status and body to an error
pub(crate) fn classify_http_error(status: u16, retry_after_secs: Option<u64>, body: String) -> LlmError {
    let lower = body.to_lowercase();
    let overflow = status == 413
        || (status == 400
            && (lower.contains("prompt is too long")
                || lower.contains("context_length_exceeded")
                || lower.contains("maximum context length")));

    if overflow {
        LlmError::ContextOverflow(body)
    } else if status == 429 {
        LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after_secs.unwrap_or(60)),
        }
    } else {
        LlmError::ApiError { status, message: body }
    }
}

/// Rough token estimation (actual tokenization varies)
/// ~4 characters per token on average for English text and code
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// LLM client that replays scripted replies in order.
///
/// Records every request it receives so tests can inspect prompts.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw text reply
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.push(Ok(CompletionResponse::text(content)));
        self
    }

    /// Queue a reply carrying `code` in a fenced block tagged `fence`
    pub fn with_code(self, fence: &str, code: &str) -> Self {
        self.with_text(format!("Here you go:\n\n```{}\n{}\n```\n", fence, code))
    }

    /// Queue an error
    pub fn with_error(self, error: LlmError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, reply: Result<CompletionResponse, LlmError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Number of completion calls made so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Copies of every request received
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("mock: no scripted replies left".to_string())))
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_ready(&self) -> bool {
        true
    }
}
