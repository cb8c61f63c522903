//! LLM Client Layer - provider integration
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient and OpenAiClient implementations
//! - MockLlmClient for tests and dry runs

pub mod anthropic;
pub mod client;
pub mod openai;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient, estimate_tokens};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
