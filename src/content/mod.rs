//! Artifact persistence.
//!
//! `ContentStore` is the seam between the iteration engine and wherever a
//! project keeps its premise, treatment, outline and prose. `FsContentStore`
//! is the project-directory implementation.

pub mod fs;
pub mod premise;
pub mod prose;

pub use fs::FsContentStore;
pub use premise::PremiseMetadata;
pub use prose::{CHAPTER_DELIMITER, join_chapters, split_chapters};

use crate::domain::ArtifactKind;
use crate::error::Result;

/// Per-kind load/save primitives for a project's artifacts
pub trait ContentStore: Send + Sync {
    /// Whether an artifact of this kind has been generated
    fn exists(&self, kind: ArtifactKind) -> bool;

    /// Current content as text
    fn load(&self, kind: ArtifactKind) -> Result<String>;

    /// Replace the artifact with generated text
    fn save(&self, kind: ArtifactKind, content: &str) -> Result<()>;

    /// Remove the artifact; removing a missing artifact is not an error
    fn delete(&self, kind: ArtifactKind) -> Result<()>;

    /// Rebuild any derived view built from this kind.
    ///
    /// Returns `Ok(false)` when there is nothing to refresh.
    fn refresh_derived(&self, kind: ArtifactKind) -> Result<bool>;
}
