//! Upstream context for a target artifact.
//!
//! Iterating on a kind only ever sees what comes before it in the pipeline:
//! the treatment is revised against the premise, the outline against the
//! premise and treatment, and so on. Downstream artifacts are never included.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};

use crate::content::{ContentStore, FsContentStore};
use crate::domain::ArtifactKind;
use crate::error::Result;
use crate::text::truncate_chars;

/// Optional story taxonomy file in the project root
pub const TAXONOMY_FILE: &str = "taxonomy.json";

/// Context keys mapped to their current values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactContext {
    entries: BTreeMap<String, String>,
}

impl ArtifactContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `## key` sections, each value capped at `max_chars`.
    pub fn to_prompt_string(&self, max_chars: usize) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("## {}\n\n{}", key, truncate_chars(value.trim(), max_chars)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds the upstream context for a target kind
pub trait ContextBuilder: Send + Sync {
    fn build(&self, kind: ArtifactKind) -> Result<ArtifactContext>;
}

/// Reads context from a project directory through a content store
pub struct ProjectContextBuilder {
    project_dir: PathBuf,
    store: Arc<dyn ContentStore>,
}

impl ProjectContextBuilder {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let store = Arc::new(FsContentStore::new(project_dir.clone()));
        Self { project_dir, store }
    }

    /// Use a specific store for artifact content
    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = store;
        self
    }
}

impl ContextBuilder for ProjectContextBuilder {
    fn build(&self, kind: ArtifactKind) -> Result<ArtifactContext> {
        let mut context = ArtifactContext::new();

        let taxonomy = self.project_dir.join(TAXONOMY_FILE);
        if taxonomy.is_file() {
            match fs::read_to_string(&taxonomy) {
                Ok(text) => context.insert("taxonomy", text),
                Err(e) => warn!("Skipping unreadable {}: {}", taxonomy.display(), e),
            }
        }

        for upstream in kind.upstream() {
            if self.store.exists(upstream) {
                context.insert(upstream.as_str(), self.store.load(upstream)?);
            }
        }

        debug!(
            "Context for {}: [{}]",
            kind,
            context.keys().collect::<Vec<_>>().join(", ")
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, FsContentStore) {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::new(temp.path());
        store.save(ArtifactKind::Premise, r#"{"premise": "A lighthouse keeper finds a map."}"#).unwrap();
        store.save(ArtifactKind::Treatment, "Treatment text").unwrap();
        store.save(ArtifactKind::Chapters, "- title: Arrival\n").unwrap();
        store.save(ArtifactKind::Prose, "Prose text").unwrap();
        (temp, store)
    }

    #[test]
    fn test_premise_has_no_upstream() {
        let (temp, _store) = project();
        let context = ProjectContextBuilder::new(temp.path()).build(ArtifactKind::Premise).unwrap();
        assert!(context.is_empty());
    }

    #[test]
    fn test_context_grows_downstream() {
        let (temp, _store) = project();
        let builder = ProjectContextBuilder::new(temp.path());

        let treatment = builder.build(ArtifactKind::Treatment).unwrap();
        assert_eq!(treatment.keys().collect::<Vec<_>>(), vec!["premise"]);

        let chapters = builder.build(ArtifactKind::Chapters).unwrap();
        assert_eq!(chapters.keys().collect::<Vec<_>>(), vec!["premise", "treatment"]);

        let prose = builder.build(ArtifactKind::Prose).unwrap();
        assert_eq!(prose.keys().collect::<Vec<_>>(), vec!["chapters", "premise", "treatment"]);
        assert!(prose.get("prose").is_none());
    }

    #[test]
    fn test_missing_upstream_is_skipped() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::new(temp.path());
        store.save(ArtifactKind::Treatment, "Treatment text").unwrap();

        let context = ProjectContextBuilder::new(temp.path()).build(ArtifactKind::Chapters).unwrap();
        assert_eq!(context.get("treatment"), Some("Treatment text"));
        assert!(context.get("premise").is_none());
    }

    #[test]
    fn test_taxonomy_included() {
        let (temp, _store) = project();
        fs::write(temp.path().join(TAXONOMY_FILE), r#"{"genre": "gothic"}"#).unwrap();

        let context = ProjectContextBuilder::new(temp.path()).build(ArtifactKind::Premise).unwrap();
        assert_eq!(context.get("taxonomy"), Some(r#"{"genre": "gothic"}"#));
    }

    #[test]
    fn test_to_prompt_string_bounds_values() {
        let mut context = ArtifactContext::new();
        context.insert("treatment", "t".repeat(50));
        context.insert("premise", "short");

        let rendered = context.to_prompt_string(10);
        assert_eq!(
            rendered,
            format!("## premise\n\nshort\n\n## treatment\n\n{}...", "t".repeat(10))
        );
    }
}
