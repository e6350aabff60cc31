//! Generation prompt assembly.

use crate::content::CHAPTER_DELIMITER;
use crate::domain::{ArtifactKind, JudgeVerdict};
use crate::history::HistoryContext;

/// Default sampling temperature for content generation
pub const DEFAULT_GENERATION_TEMPERATURE: f32 = 0.7;

/// Judge feedback from rejected attempts within one iteration call
#[derive(Debug, Clone, Default)]
pub struct JudgeFeedbackLog {
    entries: Vec<(u32, JudgeVerdict)>,
}

impl JudgeFeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attempt: u32, verdict: JudgeVerdict) {
        self.entries.push((attempt, verdict));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Attempt-labeled feedback for the next generation prompt
    pub fn format_for_prompt(&self) -> String {
        let mut output = String::new();
        for (attempt, verdict) in &self.entries {
            output.push_str(&format!("### Attempt {}\n", attempt));
            output.push_str(&verdict.describe());
            output.push('\n');
        }
        output
    }
}

/// Everything that goes into one generation request
#[derive(Debug, Clone, Copy)]
pub struct GenerationPrompt<'a> {
    pub kind: ArtifactKind,
    pub feedback: &'a str,
    pub judge_feedback: &'a JudgeFeedbackLog,
    pub history: &'a [HistoryContext],
    /// Upstream context, already serialized and bounded
    pub context: &'a str,
    pub current_content: &'a str,
}

impl GenerationPrompt<'_> {
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a novelist revising the {} of a book in progress. \
             Apply the author's feedback faithfully, keep everything else consistent with the established story, \
             and return only the revised {}.",
            self.kind.label(),
            self.kind.label()
        )
    }

    pub fn user_prompt(&self) -> String {
        let label = self.kind.label();
        let mut prompt = format!("## Feedback\n\n{}\n\n", self.feedback.trim());

        if !self.judge_feedback.is_empty() {
            prompt.push_str("## Reviewer Feedback On Previous Attempts\n\n");
            prompt.push_str(&self.judge_feedback.format_for_prompt());
            prompt.push_str("**Address every issue above in this attempt.**\n\n");
        }

        if !self.history.is_empty() {
            prompt.push_str("## Previous Iterations\n\n");
            for (i, entry) in self.history.iter().enumerate() {
                prompt.push_str(&format!("### Iteration {}\n", i + 1));
                prompt.push_str(&format!("Feedback: {}\n", entry.feedback));
                if !entry.semantic_summary.is_empty() {
                    prompt.push_str(&format!("Result: {}\n", entry.semantic_summary));
                }
                prompt.push('\n');
            }
        }

        if !self.context.trim().is_empty() {
            prompt.push_str("## Story Context\n\n");
            prompt.push_str(self.context.trim());
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("## Current {}\n\n{}\n\n", label, self.current_content));
        prompt.push_str("## Output Format\n\n");
        prompt.push_str(output_instructions(self.kind).as_str());
        prompt
    }
}

fn output_instructions(kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Premise => "Return a single JSON object with a string \"premise\" field and, where relevant, \
             \"protagonist\", \"antagonist\", \"stakes\" and a \"themes\" list."
            .to_string(),
        ArtifactKind::Treatment => "Return the complete revised treatment as markdown.".to_string(),
        ArtifactKind::Chapters => {
            "Return the complete revised chapter outline as YAML with a top-level \"chapters\" list.".to_string()
        }
        ArtifactKind::Prose => format!(
            "Return the complete revised prose. Separate chapters with a line containing only `{}`.",
            CHAPTER_DELIMITER
        ),
    }
}
