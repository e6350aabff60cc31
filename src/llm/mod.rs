//! LLM Client Layer - Anthropic API integration with streaming
//!
//! This module provides:
//! - Message and request types for LLM communication
//! - LlmClient trait for API abstraction, plus a scripted mock
//! - AnthropicClient implementation
//! - Streaming support
//! - Lenient JSON extraction from responses

pub mod anthropic;
pub mod client;
pub mod json;
pub mod streaming;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, LlmError, MockLlmClient};
pub use json::{parse_json_response, strip_markdown_fences};
pub use streaming::{StreamChunk, StreamHandle, create_stream_channel};
pub use types::{CompletionRequest, CompletionResult, Message, ResponseFormat, Role, Usage};
