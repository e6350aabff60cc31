//! Core LLM client trait, errors and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::streaming::StreamChunk;
use super::types::{CompletionRequest, CompletionResult};

/// Stateless LLM client - each call is independent (fresh context)
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, LlmError>;

    /// Streaming completion; text chunks are forwarded to `chunk_tx` as they arrive.
    ///
    /// The default falls back to `complete` and emits the whole text at once.
    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResult, LlmError> {
        let result = self.complete(request).await?;
        let _ = chunk_tx.send(StreamChunk::Text(result.text.clone())).await;
        let _ = chunk_tx.send(StreamChunk::Done).await;
        Ok(result)
    }

    /// Default model used when a request doesn't name one
    fn model(&self) -> &str;
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

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("Event source error: {0}")]
    EventSource(String),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}

/// Scripted client for tests: replays queued responses in order and records
/// every request it receives.
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    model: String,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Create a mock that answers with `responses`, one per call
    pub fn with_responses(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Queue a successful response
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock_responses().push_back(Ok(text.into()));
    }

    /// Queue a failing call
    pub fn push_error(&self, error: LlmError) {
        self.lock_responses().push_back(Err(error));
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        match self.lock_responses().pop_front() {
            Some(Ok(text)) => Ok(CompletionResult::new(text)),
            Some(Err(e)) => Err(e),
            None => Err(LlmError::InvalidResponse(
                "mock client has no scripted response left".to_string(),
            )),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
