//! Domain types for Folio
//!
//! - ArtifactKind: the four pipeline stages and their ordering
//! - IterationRecord: a completed iteration as stored in history
//! - JudgeVerdict / GenerationAttempt: transient loop state

pub mod artifact;
pub mod iteration;

pub use artifact::ArtifactKind;
pub use iteration::{ChangeStats, GenerationAttempt, IterationRecord, JudgeVerdict, RecordedVerdict, Verdict};
