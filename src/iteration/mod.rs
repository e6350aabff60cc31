//! Feedback-driven iteration on a single artifact.

pub mod coordinator;
pub mod decision;
pub mod prompt;

pub use coordinator::{CoordinatorBuilder, IterationCoordinator, IterationSettings, LoopOutcome, commit_message};
pub use decision::{
    DecisionProvider, DownstreamDecision, ReviewDecision, ReviewPrompt, RevisionDecision, RevisionPrompt,
    ScriptedDecisions,
};
pub use prompt::{GenerationPrompt, JudgeFeedbackLog};
