//! Iteration records and judge verdicts
//!
//! `IterationRecord` is what survives an iteration session: it is appended to
//! the history file once and never changed afterwards. `JudgeVerdict` and
//! `GenerationAttempt` only live for the duration of one `iterate()` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Verdict returned by the validation judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    NeedsRevision,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::NeedsRevision => "needs_revision",
        }
    }
}

/// Verdict stored in the history, including the operator override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedVerdict {
    /// Judge approved the final attempt
    Approved,
    /// Judge still wanted changes
    NeedsRevision,
    /// Operator accepted the attempt over the judge's objection
    UserAccepted,
}

impl RecordedVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordedVerdict::Approved => "approved",
            RecordedVerdict::NeedsRevision => "needs_revision",
            RecordedVerdict::UserAccepted => "user_accepted",
        }
    }
}

impl From<Verdict> for RecordedVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => RecordedVerdict::Approved,
            Verdict::NeedsRevision => RecordedVerdict::NeedsRevision,
        }
    }
}

impl std::fmt::Display for RecordedVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one judge call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub verdict: Verdict,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub specific_issues: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<String>,
}

/// Optional fields may arrive as an explicit `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl JudgeVerdict {
    pub fn approved(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Approved,
            reasoning: reasoning.into(),
            specific_issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn needs_revision(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::NeedsRevision,
            reasoning: reasoning.into(),
            specific_issues: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_issues(mut self, issues: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.specific_issues.extend(issues.into_iter().map(Into::into));
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn is_approved(&self) -> bool {
        self.verdict == Verdict::Approved
    }

    /// Reasoning, issues and suggestions as a markdown block
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if !self.reasoning.is_empty() {
            out.push_str(&self.reasoning);
            out.push('\n');
        }
        if !self.specific_issues.is_empty() {
            out.push_str("\nIssues:\n");
            for issue in &self.specific_issues {
                out.push_str(&format!("- {}\n", issue));
            }
        }
        if !self.suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("- {}\n", suggestion));
            }
        }
        out
    }
}

/// One generate/judge round inside an iteration session
#[derive(Debug, Clone)]
pub struct GenerationAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    pub content: String,
    pub verdict: JudgeVerdict,
}

/// Best-effort size of a commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStats {
    pub files_changed: u64,
    pub lines_changed: u64,
}

/// A completed iteration, as persisted in the history file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub timestamp: DateTime<Utc>,
    pub feedback: String,
    pub judge_attempts: u32,
    pub judge_verdict: RecordedVerdict,
    #[serde(default)]
    pub judge_reasoning: String,
    #[serde(default)]
    pub semantic_summary: String,
    pub commit_sha: String,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub lines_changed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(serde_json::to_string(&Verdict::Approved).unwrap(), "\"approved\"");
        assert_eq!(
            serde_json::to_string(&Verdict::NeedsRevision).unwrap(),
            "\"needs_revision\""
        );
        assert_eq!(
            serde_json::to_string(&RecordedVerdict::UserAccepted).unwrap(),
            "\"user_accepted\""
        );
    }

    #[test]
    fn test_recorded_from_verdict() {
        assert_eq!(RecordedVerdict::from(Verdict::Approved), RecordedVerdict::Approved);
        assert_eq!(
            RecordedVerdict::from(Verdict::NeedsRevision),
            RecordedVerdict::NeedsRevision
        );
    }

    #[test]
    fn test_judge_verdict_defaults_optional_fields() {
        let verdict: JudgeVerdict = serde_json::from_str(r#"{"verdict": "approved"}"#).unwrap();
        assert!(verdict.is_approved());
        assert!(verdict.reasoning.is_empty());
        assert!(verdict.specific_issues.is_empty());
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_judge_verdict_null_optional_fields() {
        let verdict: JudgeVerdict = serde_json::from_str(
            r#"{"verdict": "approved", "reasoning": null, "specific_issues": null, "suggestions": null}"#,
        )
        .unwrap();
        assert!(verdict.is_approved());
        assert!(verdict.reasoning.is_empty());
        assert!(verdict.specific_issues.is_empty());
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_judge_verdict_rejects_unknown_verdict() {
        let result = serde_json::from_str::<JudgeVerdict>(r#"{"verdict": "maybe"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe() {
        let verdict = JudgeVerdict::needs_revision("Middle act sags")
            .with_issues(["pacing drags"])
            .with_suggestions(["cut the second flashback"]);
        let text = verdict.describe();
        assert!(text.contains("Middle act sags"));
        assert!(text.contains("- pacing drags"));
        assert!(text.contains("- cut the second flashback"));
    }

    #[test]
    fn test_record_tolerates_missing_stats() {
        let json = r#"{
            "timestamp": "2026-01-01T00:00:00Z",
            "feedback": "tighten",
            "judge_attempts": 2,
            "judge_verdict": "user_accepted",
            "commit_sha": "abc1234"
        }"#;
        let record: IterationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.judge_attempts, 2);
        assert_eq!(record.judge_verdict, RecordedVerdict::UserAccepted);
        assert_eq!(record.files_changed, 0);
        assert!(record.semantic_summary.is_empty());
    }
}
