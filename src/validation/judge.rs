//! LLM-as-judge for artifact revisions.
//!
//! The judge sees the user's feedback, the iteration history, the upstream
//! context and both versions of the artifact, and answers with a strict JSON
//! verdict. It never retries: whether to try again is the coordinator's call.
//!
//! ## Response contract
//!
//! ```json
//! {
//!   "verdict": "approved" | "needs_revision",
//!   "reasoning": "...",
//!   "specific_issues": ["..."],
//!   "suggestions": ["..."]
//! }
//! ```
//!
//! Only `verdict` is required. A response without it is a protocol failure,
//! never a default verdict.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::domain::{ArtifactKind, JudgeVerdict};
use crate::error::{FolioError, Result};
use crate::history::HistoryContext;
use crate::llm::{CompletionRequest, LlmClient, parse_json_response};

/// Default sampling temperature for judge calls
pub const DEFAULT_JUDGE_TEMPERATURE: f32 = 0.1;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a strict but fair editor reviewing revisions to a novel in progress. \
You decide whether a revision addresses the author's feedback while staying consistent with the established story. \
Respond with JSON only.";

/// Inputs for one judge call
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub kind: ArtifactKind,
    pub feedback: &'a str,
    pub history: &'a [HistoryContext],
    pub old_content: &'a str,
    pub new_content: &'a str,
    /// Upstream context, already serialized and bounded
    pub context: &'a str,
}

impl JudgeRequest<'_> {
    /// Build the user prompt for the judge.
    pub fn build_prompt(&self) -> String {
        let label = self.kind.label();
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Evaluate a revised {} against the author's feedback.\n\n",
            label
        ));

        prompt.push_str("## Feedback\n\n");
        prompt.push_str(self.feedback.trim());
        prompt.push_str("\n\n");

        if !self.history.is_empty() {
            prompt.push_str("## Previous Iterations\n\n");
            for (i, entry) in self.history.iter().enumerate() {
                prompt.push_str(&format!("{}. Feedback: {}\n", i + 1, entry.feedback));
                if !entry.semantic_summary.is_empty() {
                    prompt.push_str(&format!("   Changes: {}\n", entry.semantic_summary));
                }
            }
            prompt.push('\n');
        }

        if !self.context.trim().is_empty() {
            prompt.push_str("## Story Context\n\n");
            prompt.push_str(self.context.trim());
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("## Original {}\n\n", label));
        prompt.push_str(self.old_content);
        prompt.push_str("\n\n");

        prompt.push_str(&format!("## Revised {}\n\n", label));
        prompt.push_str(self.new_content);
        prompt.push_str("\n\n");

        prompt.push_str("## Evaluation Criteria\n\n");
        prompt.push_str("1. Does the revision address the feedback directly and completely?\n");
        prompt.push_str("2. Is it consistent with the story context and earlier iterations?\n");
        prompt.push_str("3. Did it avoid changing things the feedback did not ask for?\n");
        prompt.push_str("4. Is the quality at least as good as the original?\n\n");

        prompt.push_str("## Your Response\n\n");
        prompt.push_str("Return a JSON object with exactly these fields:\n");
        prompt.push_str("- \"verdict\": \"approved\" or \"needs_revision\"\n");
        prompt.push_str("- \"reasoning\": a short explanation\n");
        prompt.push_str("- \"specific_issues\": list of concrete problems (empty when approved)\n");
        prompt.push_str("- \"suggestions\": list of concrete fixes (empty when approved)\n");

        prompt
    }
}

/// Validation judge backed by an LLM
pub struct ValidationJudge {
    client: Arc<dyn LlmClient>,
    temperature: f32,
    max_tokens: Option<u32>,
    model: Option<String>,
}

impl ValidationJudge {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            temperature: DEFAULT_JUDGE_TEMPERATURE,
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

    /// Judge one revision. Exactly one LLM call, no retries.
    pub async fn validate(&self, request: JudgeRequest<'_>) -> Result<JudgeVerdict> {
        let mut completion = CompletionRequest::new(DEFAULT_SYSTEM_PROMPT)
            .with_user_message(request.build_prompt())
            .with_model(self.model.clone())
            .with_temperature(self.temperature)
            .json();
        if let Some(max_tokens) = self.max_tokens {
            completion = completion.with_max_tokens(max_tokens);
        }

        let result = self.client.complete(completion).await?;
        let verdict = parse_judge_response(&result.text)?;

        debug!(
            "Judge verdict for {}: {} ({} issue(s))",
            request.kind,
            verdict.verdict.as_str(),
            verdict.specific_issues.len()
        );
        Ok(verdict)
    }
}

/// Parse raw judge output into a verdict.
///
/// Tolerates code fences and raw control characters inside strings. Anything
/// else that isn't valid JSON, or JSON without a `verdict` key, is an error
/// carrying the raw response.
pub fn parse_judge_response(raw: &str) -> Result<JudgeVerdict> {
    let mut value = parse_json_response(raw).map_err(|e| parse_error(e.to_string(), raw))?;

    let Some(object) = value.as_object_mut() else {
        return Err(parse_error("expected a JSON object", raw));
    };

    let Some(verdict) = object.get_mut("verdict") else {
        return Err(FolioError::MissingVerdictField { raw: raw.to_string() });
    };

    if let Value::String(s) = verdict {
        *s = s.trim().to_lowercase();
    }

    serde_json::from_value(value).map_err(|e| parse_error(e.to_string(), raw))
}

fn parse_error(reason: impl Into<String>, raw: &str) -> FolioError {
    FolioError::ResponseParse {
        what: "judge".to_string(),
        reason: reason.into(),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Verdict;
    use crate::llm::{LlmError, MockLlmClient, ResponseFormat};

    fn request<'a>(history: &'a [HistoryContext]) -> JudgeRequest<'a> {
        JudgeRequest {
            kind: ArtifactKind::Treatment,
            feedback: "Make the villain more sympathetic",
            history,
            old_content: "Old treatment",
            new_content: "New treatment",
            context: "## premise\n\nA lighthouse keeper finds a map.",
        }
    }

    #[test]
    fn test_parse_approved() {
        let verdict = parse_judge_response(r#"{"verdict": "approved", "reasoning": "Good"}"#).unwrap();
        assert!(verdict.is_approved());
        assert_eq!(verdict.reasoning, "Good");
        assert!(verdict.specific_issues.is_empty());
    }

    #[test]
    fn test_parse_needs_revision_with_lists() {
        let raw = r#"{"verdict": "needs_revision", "reasoning": "Slow", "specific_issues": ["pacing drags"], "suggestions": ["cut act two"]}"#;
        let verdict = parse_judge_response(raw).unwrap();
        assert_eq!(verdict.verdict, Verdict::NeedsRevision);
        assert_eq!(verdict.specific_issues, vec!["pacing drags".to_string()]);
        assert_eq!(verdict.suggestions, vec!["cut act two".to_string()]);
    }

    #[test]
    fn test_parse_fenced() {
        let raw = "```json\n{\"verdict\": \"approved\"}\n```";
        let verdict = parse_judge_response(raw).unwrap();
        assert!(verdict.is_approved());
        assert_eq!(verdict.reasoning, "");
    }

    #[test]
    fn test_parse_null_optional_fields() {
        let raw = r#"{"verdict": "approved", "reasoning": "ok", "specific_issues": null, "suggestions": null}"#;
        let verdict = parse_judge_response(raw).unwrap();
        assert!(verdict.is_approved());
        assert_eq!(verdict.reasoning, "ok");
        assert!(verdict.specific_issues.is_empty());
        assert!(verdict.suggestions.is_empty());

        let verdict = parse_judge_response(r#"{"verdict": "needs_revision", "reasoning": null}"#).unwrap();
        assert_eq!(verdict.verdict, Verdict::NeedsRevision);
        assert_eq!(verdict.reasoning, "");
    }

    #[test]
    fn test_null_verdict_is_not_defaulted() {
        let err = parse_judge_response(r#"{"verdict": null}"#).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_parse_control_characters() {
        let raw = "{\"verdict\": \"needs_revision\", \"reasoning\": \"line one\nline two\"}";
        let verdict = parse_judge_response(raw).unwrap();
        assert_eq!(verdict.reasoning, "line one\nline two");
    }

    #[test]
    fn test_parse_verdict_case_insensitive() {
        let verdict = parse_judge_response(r#"{"verdict": " Approved "}"#).unwrap();
        assert!(verdict.is_approved());
    }

    #[test]
    fn test_missing_verdict_is_protocol_error() {
        let raw = r#"{"reasoning": "looks fine"}"#;
        let err = parse_judge_response(raw).unwrap_err();
        match err {
            FolioError::MissingVerdictField { raw: got } => assert_eq!(got, raw),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_verdict_is_parse_error() {
        let err = parse_judge_response(r#"{"verdict": "maybe"}"#).unwrap_err();
        assert!(matches!(err, FolioError::ResponseParse { .. }));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_not_json_is_parse_error_with_raw() {
        let err = parse_judge_response("PASS, looks great").unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("PASS, looks great"));
    }

    #[test]
    fn test_array_is_parse_error() {
        let err = parse_judge_response(r#"[{"verdict": "approved"}]"#).unwrap_err();
        assert!(matches!(err, FolioError::ResponseParse { .. }));
    }

    #[test]
    fn test_build_prompt_includes_inputs() {
        let history = vec![HistoryContext {
            feedback: "Darker tone".to_string(),
            semantic_summary: "Added storm imagery".to_string(),
        }];
        let prompt = request(&history).build_prompt();

        assert!(prompt.contains("Make the villain more sympathetic"));
        assert!(prompt.contains("Darker tone"));
        assert!(prompt.contains("Added storm imagery"));
        assert!(prompt.contains("lighthouse keeper"));
        assert!(prompt.contains("## Original treatment\n\nOld treatment"));
        assert!(prompt.contains("## Revised treatment\n\nNew treatment"));
        assert!(prompt.contains("\"verdict\""));
    }

    #[test]
    fn test_build_prompt_omits_empty_sections() {
        let mut req = request(&[]);
        req.context = "  ";
        let prompt = req.build_prompt();
        assert!(!prompt.contains("## Previous Iterations"));
        assert!(!prompt.contains("## Story Context"));
    }

    #[tokio::test]
    async fn test_validate_sends_one_json_request() {
        let client = Arc::new(MockLlmClient::with_responses([r#"{"verdict": "approved", "reasoning": "ok"}"#]));
        let judge = ValidationJudge::new(client.clone()).with_max_tokens(1000);

        let verdict = judge.validate(request(&[])).await.unwrap();
        assert!(verdict.is_approved());

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format, ResponseFormat::Json);
        assert_eq!(requests[0].temperature, Some(DEFAULT_JUDGE_TEMPERATURE));
        assert_eq!(requests[0].max_tokens, Some(1000));
        assert!(requests[0].user_text().contains("New treatment"));
    }

    #[tokio::test]
    async fn test_validate_missing_verdict_does_not_retry() {
        let client = Arc::new(MockLlmClient::with_responses([
            r#"{"reasoning": "no verdict"}"#,
            r#"{"verdict": "approved"}"#,
        ]));
        let judge = ValidationJudge::new(client.clone());

        let err = judge.validate(request(&[])).await.unwrap_err();
        assert!(matches!(err, FolioError::MissingVerdictField { .. }));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_validate_propagates_llm_error() {
        let client = Arc::new(MockLlmClient::new());
        client.push_error(LlmError::ApiError {
            status: 500,
            message: "overloaded".to_string(),
        });
        let judge = ValidationJudge::new(client);

        let err = judge.validate(request(&[])).await.unwrap_err();
        assert!(matches!(err, FolioError::Llm(LlmError::ApiError { status: 500, .. })));
    }
}
