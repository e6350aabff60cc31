//! Operator decisions during an iteration.
//!
//! Every point where the coordinator needs a human goes through
//! `DecisionProvider`. The binary answers from the terminal; tests answer
//! from a script.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{ArtifactKind, JudgeVerdict};

/// What to do with existing downstream artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamDecision {
    /// Delete them once the new content is accepted
    Cull,
    /// Leave them as they are
    Keep,
    Abort,
}

/// Answer to a `needs_revision` verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionDecision {
    /// Feed the judge's notes back and generate again
    Continue,
    /// Take this attempt despite the verdict
    AcceptAnyway,
    /// Show a semantic diff of this attempt, then ask again
    ViewDiff,
    Abort,
}

/// Answer at the final approval gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
    /// Show more detail, then ask again
    ViewDetail,
}

/// What the operator is shown when the judge wants changes
#[derive(Debug, Clone)]
pub struct RevisionPrompt<'a> {
    pub kind: ArtifactKind,
    pub attempt: u32,
    pub verdict: &'a JudgeVerdict,
    /// False once the attempt cap is reached; `Continue` then means abort
    pub retry_allowed: bool,
}

/// The final summary shown at the approval gate
#[derive(Debug, Clone)]
pub struct ReviewPrompt<'a> {
    pub kind: ArtifactKind,
    pub semantic_diff: &'a str,
    pub attempts: u32,
    pub verdict: &'a JudgeVerdict,
}

/// Source of operator decisions
pub trait DecisionProvider: Send + Sync {
    /// First iteration ever on this artifact: confirm content will be replaced
    fn confirm_first_iteration(&mut self, kind: ArtifactKind) -> bool;

    /// Downstream artifacts exist; cull, keep or abort
    fn downstream_impact(&mut self, kind: ArtifactKind, downstream: &[ArtifactKind]) -> DownstreamDecision;

    fn needs_revision(&mut self, prompt: &RevisionPrompt<'_>) -> RevisionDecision;

    /// Show a semantic diff produced for inspection only
    fn show_diff(&mut self, kind: ArtifactKind, diff: &str);

    fn review(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewDecision;

    /// Show extra detail after `ReviewDecision::ViewDetail`
    fn show_detail(&mut self, kind: ArtifactKind, new_content: &str, verdict: &JudgeVerdict);
}

#[derive(Debug, Default)]
struct Script {
    confirm_first: bool,
    downstream: VecDeque<DownstreamDecision>,
    revisions: VecDeque<RevisionDecision>,
    reviews: VecDeque<ReviewDecision>,
    shown_diffs: Vec<String>,
    reviewed_diffs: Vec<String>,
    shown_details: usize,
    revision_prompts: Vec<(u32, bool)>,
}

/// Decisions read from a script.
///
/// Clones share the same script, so a test can hand one clone to the
/// coordinator and inspect what was shown through another. Exhausted queues
/// answer `Abort` (or `Reject` at the review gate).
#[derive(Debug, Clone)]
pub struct ScriptedDecisions {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedDecisions {
    /// Confirms the first iteration; everything else is scripted
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                confirm_first: true,
                ..Default::default()
            })),
        }
    }

    pub fn decline_first_iteration(self) -> Self {
        self.lock().confirm_first = false;
        self
    }

    pub fn downstream(self, decision: DownstreamDecision) -> Self {
        self.lock().downstream.push_back(decision);
        self
    }

    pub fn revision(self, decision: RevisionDecision) -> Self {
        self.lock().revisions.push_back(decision);
        self
    }

    pub fn review(self, decision: ReviewDecision) -> Self {
        self.lock().reviews.push_back(decision);
        self
    }

    /// Diffs passed to `show_diff`, in order
    pub fn shown_diffs(&self) -> Vec<String> {
        self.lock().shown_diffs.clone()
    }

    /// Semantic diffs presented at the review gate, in order
    pub fn reviewed_diffs(&self) -> Vec<String> {
        self.lock().reviewed_diffs.clone()
    }

    pub fn shown_details(&self) -> usize {
        self.lock().shown_details
    }

    /// `(attempt, retry_allowed)` for every revision prompt
    pub fn revision_prompts(&self) -> Vec<(u32, bool)> {
        self.lock().revision_prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ScriptedDecisions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn confirm_first_iteration(&mut self, _kind: ArtifactKind) -> bool {
        self.lock().confirm_first
    }

    fn downstream_impact(&mut self, _kind: ArtifactKind, _downstream: &[ArtifactKind]) -> DownstreamDecision {
        self.lock().downstream.pop_front().unwrap_or(DownstreamDecision::Abort)
    }

    fn needs_revision(&mut self, prompt: &RevisionPrompt<'_>) -> RevisionDecision {
        let mut script = self.lock();
        script.revision_prompts.push((prompt.attempt, prompt.retry_allowed));
        script.revisions.pop_front().unwrap_or(RevisionDecision::Abort)
    }

    fn show_diff(&mut self, _kind: ArtifactKind, diff: &str) {
        self.lock().shown_diffs.push(diff.to_string());
    }

    fn review(&mut self, prompt: &ReviewPrompt<'_>) -> ReviewDecision {
        let mut script = self.lock();
        script.reviewed_diffs.push(prompt.semantic_diff.to_string());
        script.reviews.pop_front().unwrap_or(ReviewDecision::Reject)
    }

    fn show_detail(&mut self, _kind: ArtifactKind, _new_content: &str, _verdict: &JudgeVerdict) {
        self.lock().shown_details += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_replays_in_order() {
        let mut decisions = ScriptedDecisions::new()
            .revision(RevisionDecision::ViewDiff)
            .revision(RevisionDecision::Continue)
            .review(ReviewDecision::Accept);
        let verdict = JudgeVerdict::needs_revision("no");
        let prompt = RevisionPrompt {
            kind: ArtifactKind::Treatment,
            attempt: 1,
            verdict: &verdict,
            retry_allowed: true,
        };

        assert!(decisions.confirm_first_iteration(ArtifactKind::Treatment));
        assert_eq!(decisions.needs_revision(&prompt), RevisionDecision::ViewDiff);
        assert_eq!(decisions.needs_revision(&prompt), RevisionDecision::Continue);
        assert_eq!(decisions.needs_revision(&prompt), RevisionDecision::Abort);
        assert_eq!(decisions.revision_prompts(), vec![(1, true); 3]);
    }

    #[test]
    fn test_exhausted_script_aborts() {
        let mut decisions = ScriptedDecisions::new().decline_first_iteration();
        let verdict = JudgeVerdict::approved("ok");
        let review = ReviewPrompt {
            kind: ArtifactKind::Premise,
            semantic_diff: "diff",
            attempts: 1,
            verdict: &verdict,
        };

        assert!(!decisions.confirm_first_iteration(ArtifactKind::Premise));
        assert_eq!(
            decisions.downstream_impact(ArtifactKind::Premise, &[ArtifactKind::Treatment]),
            DownstreamDecision::Abort
        );
        assert_eq!(DecisionProvider::review(&mut decisions, &review), ReviewDecision::Reject);
    }

    #[test]
    fn test_clones_share_state() {
        let observer = ScriptedDecisions::new();
        let mut provider = observer.clone();

        provider.show_diff(ArtifactKind::Chapters, "merged two chapters");
        provider.show_detail(ArtifactKind::Chapters, "content", &JudgeVerdict::approved(""));

        assert_eq!(observer.shown_diffs(), vec!["merged two chapters".to_string()]);
        assert_eq!(observer.shown_details(), 1);
    }
}
