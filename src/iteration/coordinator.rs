//! The iteration state machine.
//!
//! ```text
//! preconditions -> load context/history -> first-iteration gate
//!   -> downstream decision -> snapshot -> [Generating -> Judging]* -> diff
//!   -> approval gate -> finalize (save, refresh, cull, commit, record)
//! ```
//!
//! Nothing durable is written before the approval gate passes. Every abort
//! returns `Ok(false)` with the artifact, history and repository untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::decision::{
    DecisionProvider, DownstreamDecision, ReviewDecision, ReviewPrompt, RevisionDecision, RevisionPrompt,
};
use super::prompt::{DEFAULT_GENERATION_TEMPERATURE, GenerationPrompt, JudgeFeedbackLog};
use crate::content::{ContentStore, FsContentStore};
use crate::context::{ContextBuilder, ProjectContextBuilder};
use crate::coordination::Invalidator;
use crate::domain::{ArtifactKind, ChangeStats, GenerationAttempt, RecordedVerdict};
use crate::error::{FolioError, Result};
use crate::history::{HistoryContext, HistoryStore, NewIteration};
use crate::history::store::{DEFAULT_PREVIEW_CHARS, DEFAULT_SUMMARY_MAX_CHARS};
use crate::llm::{CompletionRequest, LlmClient, StreamChunk};
use crate::text::{preview, truncate_chars};
use crate::trace::DebugTrace;
use crate::validation::judge::DEFAULT_JUDGE_TEMPERATURE;
use crate::validation::semantic_diff::DEFAULT_DIFF_TEMPERATURE;
use crate::validation::{DiffRequest, JudgeRequest, SemanticDiffGenerator, ValidationJudge};
use crate::vcs::{Untracked, VersionControl};

/// Tunables for one coordinator
#[derive(Debug, Clone)]
pub struct IterationSettings {
    /// Used to tag commit messages; defaults to the project directory name
    pub project_name: Option<String>,
    /// Model override; `None` uses the client's default
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub generation_temperature: f32,
    pub judge_temperature: f32,
    pub diff_temperature: f32,
    /// Cap on generate/judge rounds; `None` leaves it to the operator
    pub max_attempts: Option<u32>,
    pub summary_max_chars: usize,
    pub preview_chars: usize,
    pub context_max_chars: usize,
    pub commit_feedback_chars: usize,
}

impl Default for IterationSettings {
    fn default() -> Self {
        Self {
            project_name: None,
            model: None,
            max_tokens: None,
            generation_temperature: DEFAULT_GENERATION_TEMPERATURE,
            judge_temperature: DEFAULT_JUDGE_TEMPERATURE,
            diff_temperature: DEFAULT_DIFF_TEMPERATURE,
            max_attempts: None,
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            context_max_chars: 20_000,
            commit_feedback_chars: 50,
        }
    }
}

/// How the generate/judge loop ended
#[derive(Debug, Clone)]
pub enum LoopOutcome {
    Accepted {
        attempt: GenerationAttempt,
        recorded: RecordedVerdict,
    },
    Aborted,
}

/// Inputs shared by every round of one `iterate()` call
struct Session<'a> {
    kind: ArtifactKind,
    feedback: &'a str,
    history: &'a [HistoryContext],
    context: &'a str,
    old_content: &'a str,
}

/// Assembles an `IterationCoordinator`
pub struct CoordinatorBuilder {
    project_dir: PathBuf,
    client: Arc<dyn LlmClient>,
    settings: IterationSettings,
    content: Option<Arc<dyn ContentStore>>,
    context: Option<Box<dyn ContextBuilder>>,
    vcs: Option<Arc<dyn VersionControl>>,
    decisions: Option<Box<dyn DecisionProvider>>,
    trace: DebugTrace,
    display: Option<mpsc::Sender<StreamChunk>>,
}

impl CoordinatorBuilder {
    pub fn settings(mut self, settings: IterationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content = Some(store);
        self
    }

    pub fn context_builder(mut self, builder: Box<dyn ContextBuilder>) -> Self {
        self.context = Some(builder);
        self
    }

    pub fn vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    pub fn decisions(mut self, decisions: Box<dyn DecisionProvider>) -> Self {
        self.decisions = Some(decisions);
        self
    }

    pub fn trace(mut self, trace: DebugTrace) -> Self {
        self.trace = trace;
        self
    }

    /// Stream generated text to this sink as it arrives
    pub fn display(mut self, sink: mpsc::Sender<StreamChunk>) -> Self {
        self.display = Some(sink);
        self
    }

    pub fn build(self) -> Result<IterationCoordinator> {
        let decisions = self
            .decisions
            .ok_or_else(|| FolioError::Config("a decision provider is required".to_string()))?;

        let content: Arc<dyn ContentStore> = match self.content {
            Some(store) => store,
            None => Arc::new(FsContentStore::new(self.project_dir.clone())),
        };
        let context = match self.context {
            Some(builder) => builder,
            None => Box::new(ProjectContextBuilder::new(self.project_dir.clone()).with_store(content.clone())),
        };
        let vcs = self.vcs.unwrap_or_else(|| Arc::new(Untracked));

        let mut settings = self.settings;
        if settings.project_name.is_none() {
            settings.project_name = Some(FsContentStore::new(self.project_dir.clone()).project_name());
        }

        let mut judge = ValidationJudge::new(self.client.clone())
            .with_temperature(settings.judge_temperature)
            .with_model(settings.model.clone());
        let mut differ = SemanticDiffGenerator::new(self.client.clone())
            .with_temperature(settings.diff_temperature)
            .with_model(settings.model.clone());
        if let Some(max_tokens) = settings.max_tokens {
            judge = judge.with_max_tokens(max_tokens);
            differ = differ.with_max_tokens(max_tokens);
        }

        Ok(IterationCoordinator {
            project_dir: self.project_dir,
            client: self.client,
            judge,
            differ,
            invalidator: Invalidator::new(content.clone()),
            content,
            context,
            vcs,
            decisions,
            trace: self.trace,
            display: self.display,
            settings,
        })
    }
}

/// Drives one feedback-driven revision of an artifact
pub struct IterationCoordinator {
    project_dir: PathBuf,
    client: Arc<dyn LlmClient>,
    judge: ValidationJudge,
    differ: SemanticDiffGenerator,
    invalidator: Invalidator,
    content: Arc<dyn ContentStore>,
    context: Box<dyn ContextBuilder>,
    vcs: Arc<dyn VersionControl>,
    decisions: Box<dyn DecisionProvider>,
    trace: DebugTrace,
    display: Option<mpsc::Sender<StreamChunk>>,
    settings: IterationSettings,
}

impl IterationCoordinator {
    pub fn builder(project_dir: impl Into<PathBuf>, client: Arc<dyn LlmClient>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            project_dir: project_dir.into(),
            client,
            settings: IterationSettings::default(),
            content: None,
            context: None,
            vcs: None,
            decisions: None,
            trace: DebugTrace::disabled(),
            display: None,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn settings(&self) -> &IterationSettings {
        &self.settings
    }

    /// Revise the `kind` artifact according to `feedback`.
    ///
    /// Returns `Ok(true)` once the new content is saved, committed and
    /// recorded, and `Ok(false)` if the operator stopped at any gate.
    pub async fn iterate(&mut self, kind: ArtifactKind, feedback: &str) -> Result<bool> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(FolioError::EmptyFeedback);
        }
        if !self.content.exists(kind) {
            return Err(FolioError::ArtifactMissing { kind });
        }
        self.vcs.ensure_ready()?;

        let context = self.context.build(kind)?;
        let context_text = context.to_prompt_string(self.settings.context_max_chars);
        let mut history = HistoryStore::open(&self.project_dir, kind)
            .with_limits(self.settings.summary_max_chars, self.settings.preview_chars);
        let history_context = history.context_for_llm();
        info!("Iterating {} ({} previous iteration(s))", kind, history.count());

        if history.is_empty() && !self.decisions.confirm_first_iteration(kind) {
            info!("First iteration on {} declined", kind);
            return Ok(false);
        }

        let downstream = self.invalidator.existing_downstream(kind);
        let cull = if downstream.is_empty() {
            false
        } else {
            match self.decisions.downstream_impact(kind, &downstream) {
                DownstreamDecision::Cull => true,
                DownstreamDecision::Keep => false,
                DownstreamDecision::Abort => {
                    info!("Iteration on {} aborted at downstream check", kind);
                    return Ok(false);
                }
            }
        };

        let old_content = self.content.load(kind)?;
        let session = Session {
            kind,
            feedback,
            history: &history_context,
            context: &context_text,
            old_content: &old_content,
        };

        let (attempt, recorded) = match self.run_loop(&session).await? {
            LoopOutcome::Accepted { attempt, recorded } => (attempt, recorded),
            LoopOutcome::Aborted => {
                info!("Iteration on {} aborted during revision", kind);
                return Ok(false);
            }
        };

        let semantic_diff = self.diff(&session, &attempt.content, &attempt.verdict.reasoning).await?;
        let review_diff = truncate_chars(&semantic_diff, self.settings.summary_max_chars);

        loop {
            let decision = self.decisions.review(&ReviewPrompt {
                kind,
                semantic_diff: &review_diff,
                attempts: attempt.attempt,
                verdict: &attempt.verdict,
            });
            match decision {
                ReviewDecision::Accept => break,
                ReviewDecision::Reject => {
                    info!("Revision of {} rejected at review", kind);
                    return Ok(false);
                }
                ReviewDecision::ViewDetail => {
                    self.decisions.show_detail(kind, &attempt.content, &attempt.verdict)
                }
            }
        }

        let present = if cull { downstream } else { Vec::new() };
        self.finalize(&session, &mut history, &attempt, recorded, &semantic_diff, &present)?;
        Ok(true)
    }

    /// Generate and judge until approved, accepted anyway, or aborted.
    async fn run_loop(&mut self, session: &Session<'_>) -> Result<LoopOutcome> {
        self.trace.start_session(session.kind);
        let mut judge_feedback = JudgeFeedbackLog::new();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!("Generating {} attempt {}", session.kind, attempt);

            let content = self.generate(session, &judge_feedback).await?;
            self.trace.record_content(attempt, &content);

            let verdict = self
                .judge
                .validate(JudgeRequest {
                    kind: session.kind,
                    feedback: session.feedback,
                    history: session.history,
                    old_content: session.old_content,
                    new_content: &content,
                    context: session.context,
                })
                .await?;
            self.trace.record_verdict(attempt, &content, &verdict);

            if verdict.is_approved() {
                info!("Judge approved {} on attempt {}", session.kind, attempt);
                let recorded = RecordedVerdict::from(verdict.verdict);
                return Ok(LoopOutcome::Accepted {
                    attempt: GenerationAttempt {
                        attempt,
                        content,
                        verdict,
                    },
                    recorded,
                });
            }

            let retry_allowed = self.settings.max_attempts.is_none_or(|max| attempt < max);

            loop {
                let decision = self.decisions.needs_revision(&RevisionPrompt {
                    kind: session.kind,
                    attempt,
                    verdict: &verdict,
                    retry_allowed,
                });

                match decision {
                    RevisionDecision::Continue if retry_allowed => {
                        judge_feedback.push(attempt, verdict);
                        break;
                    }
                    RevisionDecision::Continue => {
                        warn!("Attempt limit reached for {}; stopping", session.kind);
                        return Ok(LoopOutcome::Aborted);
                    }
                    RevisionDecision::AcceptAnyway => {
                        info!("{} attempt {} accepted over judge objection", session.kind, attempt);
                        return Ok(LoopOutcome::Accepted {
                            attempt: GenerationAttempt {
                                attempt,
                                content,
                                verdict,
                            },
                            recorded: RecordedVerdict::UserAccepted,
                        });
                    }
                    RevisionDecision::ViewDiff => {
                        let diff = self.diff(session, &content, &verdict.reasoning).await?;
                        self.decisions.show_diff(session.kind, &diff);
                    }
                    RevisionDecision::Abort => return Ok(LoopOutcome::Aborted),
                }
            }
        }
    }

    async fn generate(&self, session: &Session<'_>, judge_feedback: &JudgeFeedbackLog) -> Result<String> {
        let prompt = GenerationPrompt {
            kind: session.kind,
            feedback: session.feedback,
            judge_feedback,
            history: session.history,
            context: session.context,
            current_content: session.old_content,
        };

        let mut request = CompletionRequest::new(prompt.system_prompt())
            .with_user_message(prompt.user_prompt())
            .with_model(self.settings.model.clone())
            .with_temperature(self.settings.generation_temperature);
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if session.kind == ArtifactKind::Premise {
            request = request.json();
        }

        let result = match &self.display {
            Some(sink) => self.client.stream(request, sink.clone()).await?,
            None => self.client.complete(request).await?,
        };

        let text = result.text.trim();
        if text.is_empty() {
            return Err(FolioError::EmptyResponse(format!("{} generation", session.kind)));
        }
        Ok(text.to_string())
    }

    async fn diff(&self, session: &Session<'_>, new_content: &str, judge_reasoning: &str) -> Result<String> {
        self.differ
            .generate_diff(DiffRequest {
                kind: session.kind,
                feedback: session.feedback,
                history: session.history,
                old_content: session.old_content,
                new_content,
                judge_reasoning,
            })
            .await
    }

    fn finalize(
        &self,
        session: &Session<'_>,
        history: &mut HistoryStore,
        attempt: &GenerationAttempt,
        recorded: RecordedVerdict,
        semantic_diff: &str,
        cull: &[ArtifactKind],
    ) -> Result<()> {
        let kind = session.kind;
        let backup = cull
            .iter()
            .copied()
            .filter(|k| k.is_downstream_of(kind) && self.content.exists(*k))
            .map(|k| self.content.load(k).map(|text| (k, text)))
            .collect::<Result<Vec<_>>>()?;

        let commit_sha = match self.apply_and_commit(session, &attempt.content, cull) {
            Ok(sha) => sha,
            Err(e) => {
                warn!("Finalizing {} failed, restoring previous content: {}", kind, e);
                self.restore(session, &backup);
                return Err(e);
            }
        };

        let stats = self.vcs.change_stats(&commit_sha).unwrap_or_else(|e| {
            warn!("Could not read change stats for {}: {}", commit_sha, e);
            ChangeStats::default()
        });

        history.add_iteration(NewIteration {
            feedback: session.feedback.to_string(),
            judge_attempts: attempt.attempt,
            judge_verdict: recorded,
            judge_reasoning: attempt.verdict.reasoning.clone(),
            semantic_summary: semantic_diff.to_string(),
            commit_sha,
            stats,
        })?;

        info!("Iteration on {} recorded ({} attempt(s), {})", kind, attempt.attempt, recorded);
        Ok(())
    }

    /// Save, refresh, cull and commit; returns the commit id
    fn apply_and_commit(&self, session: &Session<'_>, content: &str, cull: &[ArtifactKind]) -> Result<String> {
        let kind = session.kind;
        self.content.save(kind, content)?;

        match self.content.refresh_derived(kind) {
            Ok(true) => debug!("Refreshed derived view for {}", kind),
            Ok(false) => {}
            Err(e) => warn!("Could not refresh derived view for {}: {}", kind, e),
        }

        if !cull.is_empty() {
            let culled = self.invalidator.cull(kind, cull)?;
            info!("Culled {} downstream artifact(s)", culled.len());
        }

        let project = self.settings.project_name.as_deref().unwrap_or("project");
        let message = commit_message(project, kind, session.feedback, self.settings.commit_feedback_chars);
        self.vcs.add()?;
        self.vcs.commit(&message)
    }

    /// Put back the pre-iteration target and any culled artifacts
    fn restore(&self, session: &Session<'_>, culled: &[(ArtifactKind, String)]) {
        let originals = std::iter::once((session.kind, session.old_content)).chain(
            culled.iter().map(|(kind, text)| (*kind, text.as_str())),
        );
        for (kind, text) in originals {
            if let Err(e) = self.content.save(kind, text) {
                warn!("Could not restore {}: {}", kind, e);
                continue;
            }
            if let Err(e) = self.content.refresh_derived(kind) {
                warn!("Could not refresh derived view for {}: {}", kind, e);
            }
        }
    }
}

/// `[<project>] Iterate <kind>: <feedback prefix>`
pub fn commit_message(project: &str, kind: ArtifactKind, feedback: &str, max_feedback_chars: usize) -> String {
    format!("[{}] Iterate {}: {}", project, kind, preview(feedback, max_feedback_chars))
}
