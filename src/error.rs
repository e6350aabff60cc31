//! Error types for Folio
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::domain::ArtifactKind;
use crate::llm::LlmError;

/// All error types that can occur while iterating on an artifact
#[derive(Debug, Error)]
pub enum FolioError {
    /// Target name is not one of the four artifact kinds
    #[error("Invalid target: {0} (expected one of: premise, treatment, chapters, prose)")]
    InvalidTarget(String),

    /// The artifact to iterate on has not been generated yet
    #[error("No {kind} found for this project; generate it before iterating")]
    ArtifactMissing { kind: ArtifactKind },

    /// Feedback was empty after trimming
    #[error("Feedback must not be empty")]
    EmptyFeedback,

    /// Judge answered without the required `verdict` key
    #[error("Judge response is missing the required 'verdict' field\nRaw response:\n{raw}")]
    MissingVerdictField { raw: String },

    /// An LLM response could not be parsed
    #[error("Failed to parse {what} response: {reason}\nRaw response:\n{raw}")]
    ResponseParse { what: String, reason: String, raw: String },

    /// The LLM returned no content at all
    #[error("Empty response from LLM for {0}")]
    EmptyResponse(String),

    /// LLM transport or model error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Artifact content could not be loaded, saved or deleted
    #[error("Content error: {0}")]
    Content(String),

    /// History store error
    #[error("History error: {0}")]
    History(String),

    /// Version control error
    #[error("Version control error: {0}")]
    Vcs(String),

    /// The project cannot be committed to
    #[error("Version control unavailable: {0}")]
    VcsUnavailable(String),

    /// Coordinator was assembled without a required collaborator
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FolioError {
    /// Errors raised before any side effect takes place
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FolioError::InvalidTarget(_)
                | FolioError::ArtifactMissing { .. }
                | FolioError::EmptyFeedback
                | FolioError::VcsUnavailable(_)
        )
    }

    /// Errors caused by the LLM breaking the response contract
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            FolioError::MissingVerdictField { .. } | FolioError::ResponseParse { .. } | FolioError::EmptyResponse(_)
        )
    }
}

/// Result type alias for Folio operations
pub type Result<T> = std::result::Result<T, FolioError>;
