//! LLM-backed review of a revision: the judge decides, the diff explains.

pub mod judge;
pub mod semantic_diff;

pub use judge::{JudgeRequest, ValidationJudge, parse_judge_response};
pub use semantic_diff::{DiffRequest, SemanticDiffGenerator};
