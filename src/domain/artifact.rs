//! Artifact kinds and their pipeline ordering
//!
//! A book project moves through four progressively more detailed artifacts:
//! premise → treatment → chapters (outline) → prose. Everything after a kind
//! in that order is derived from it and is considered "downstream".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FolioError;

/// The four artifact kinds of a book project, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Premise,
    Treatment,
    Chapters,
    Prose,
}

impl ArtifactKind {
    /// All kinds in pipeline order
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Premise,
        ArtifactKind::Treatment,
        ArtifactKind::Chapters,
        ArtifactKind::Prose,
    ];

    /// Stable lowercase name, used for file names and prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Premise => "premise",
            ArtifactKind::Treatment => "treatment",
            ArtifactKind::Chapters => "chapters",
            ArtifactKind::Prose => "prose",
        }
    }

    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Premise => "premise",
            ArtifactKind::Treatment => "treatment",
            ArtifactKind::Chapters => "chapter outline",
            ArtifactKind::Prose => "prose",
        }
    }

    /// Kinds strictly after this one in pipeline order
    pub fn downstream(&self) -> Vec<ArtifactKind> {
        Self::ALL.iter().copied().filter(|k| k > self).collect()
    }

    /// Kinds strictly before this one in pipeline order
    pub fn upstream(&self) -> Vec<ArtifactKind> {
        Self::ALL.iter().copied().filter(|k| k < self).collect()
    }

    /// True if `self` is derived from `other`
    pub fn is_downstream_of(&self, other: ArtifactKind) -> bool {
        *self > other
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "premise" => Ok(ArtifactKind::Premise),
            "treatment" => Ok(ArtifactKind::Treatment),
            "chapters" => Ok(ArtifactKind::Chapters),
            "prose" => Ok(ArtifactKind::Prose),
            _ => Err(FolioError::InvalidTarget(s.to_string())),
        }
    }
}
