//! Human-readable summaries of what changed between two artifact versions.
//!
//! The summary is advisory and shown to the operator; nothing downstream
//! parses it.

use std::sync::Arc;

use crate::domain::ArtifactKind;
use crate::error::{FolioError, Result};
use crate::history::HistoryContext;
use crate::llm::{CompletionRequest, LlmClient};

/// Default sampling temperature for diff calls
pub const DEFAULT_DIFF_TEMPERATURE: f32 = 0.3;

const DEFAULT_SYSTEM_PROMPT: &str = "You summarize revisions to a novel in progress for its author. \
Describe what changed in story terms (plot, characters, tone, structure), not line by line.";

/// Inputs for one diff call
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    pub kind: ArtifactKind,
    pub feedback: &'a str,
    pub history: &'a [HistoryContext],
    pub old_content: &'a str,
    pub new_content: &'a str,
    pub judge_reasoning: &'a str,
}

impl DiffRequest<'_> {
    pub fn build_prompt(&self) -> String {
        let label = self.kind.label();
        let mut prompt = format!(
            "Summarize the changes between two versions of a {}.\n\n## Feedback Being Addressed\n\n{}\n\n",
            label,
            self.feedback.trim()
        );

        if !self.history.is_empty() {
            prompt.push_str("## Earlier Feedback\n\n");
            for entry in self.history {
                prompt.push_str(&format!("- {}\n", entry.feedback));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!("## Original {}\n\n{}\n\n", label, self.old_content));
        prompt.push_str(&format!("## Revised {}\n\n{}\n\n", label, self.new_content));

        if !self.judge_reasoning.trim().is_empty() {
            prompt.push_str(&format!("## Reviewer Notes\n\n{}\n\n", self.judge_reasoning.trim()));
        }

        prompt.push_str(
            "Write a short summary (a few bullet points) of the meaningful changes, \
             then one sentence on how well they address the feedback. Plain text only.",
        );
        prompt
    }
}

/// Semantic diff generator backed by an LLM
pub struct SemanticDiffGenerator {
    client: Arc<dyn LlmClient>,
    temperature: f32,
    max_tokens: Option<u32>,
    model: Option<String>,
}

impl SemanticDiffGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            temperature: DEFAULT_DIFF_TEMPERATURE,
            max_tokens: None,
            model: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Summarize old vs new. Whatever non-empty text comes back is accepted.
    pub async fn generate_diff(&self, request: DiffRequest<'_>) -> Result<String> {
        let mut completion = CompletionRequest::new(DEFAULT_SYSTEM_PROMPT)
            .with_user_message(request.build_prompt())
            .with_model(self.model.clone())
            .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            completion = completion.with_max_tokens(max_tokens);
        }

        let result = self.client.complete(completion).await?;
        let text = result.text.trim();
        if text.is_empty() {
            return Err(FolioError::EmptyResponse("semantic diff".to_string()));
        }
        Ok(text.to_string())
    }
}
