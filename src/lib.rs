//! Folio - feedback-driven revision of novel artifacts
//!
//! A book project moves through premise, treatment, chapter outline and
//! prose. Folio revises any one of them from natural-language feedback: it
//! generates a new version, has an LLM judge check it against the feedback,
//! retries with the judge's notes until the operator is satisfied, then
//! saves, commits and records the iteration while optionally culling the
//! now-stale downstream artifacts.

pub mod content;
pub mod context;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod history;
pub mod iteration;
pub mod llm;
pub mod text;
pub mod trace;
pub mod validation;
pub mod vcs;

pub use error::{FolioError, Result};
