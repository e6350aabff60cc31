//! Filesystem content store.
//!
//! Project layout:
//!
//! ```text
//! <project>/
//!   premise_metadata.json
//!   treatment.md
//!   chapters.yaml
//!   chapters/chapter-01.md ...
//!   manuscript.md            (derived from chapters/, optional)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::Value as YamlValue;

use super::ContentStore;
use super::premise::PremiseMetadata;
use super::prose::{chapter_file_name, join_chapters, split_chapters};
use crate::domain::ArtifactKind;
use crate::error::{FolioError, Result};
use crate::llm::strip_markdown_fences;

const PREMISE_FILE: &str = "premise_metadata.json";
const TREATMENT_FILE: &str = "treatment.md";
const OUTLINE_FILE: &str = "chapters.yaml";
const PROSE_DIR: &str = "chapters";
const MANUSCRIPT_FILE: &str = "manuscript.md";

/// Content store rooted at a project directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    project_dir: PathBuf,
}

impl FsContentStore {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Project name, used to tag commits
    pub fn project_name(&self) -> String {
        self.project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    }

    fn file_for(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Premise => self.project_dir.join(PREMISE_FILE),
            ArtifactKind::Treatment => self.project_dir.join(TREATMENT_FILE),
            ArtifactKind::Chapters => self.project_dir.join(OUTLINE_FILE),
            ArtifactKind::Prose => self.project_dir.join(PROSE_DIR),
        }
    }

    fn manuscript_path(&self) -> PathBuf {
        self.project_dir.join(MANUSCRIPT_FILE)
    }

    /// Chapter files in chapter order
    fn chapter_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.project_dir.join(PROSE_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!("{}/chapter-*.md", glob::Pattern::escape(&dir.to_string_lossy()));
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| FolioError::Content(format!("Bad chapter pattern: {}", e)))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Number of chapters the outline declares, if it can be told
    fn outline_chapter_count(&self) -> Option<usize> {
        let raw = fs::read_to_string(self.file_for(ArtifactKind::Chapters)).ok()?;
        let value: YamlValue = serde_yaml::from_str(&raw).ok()?;
        match &value {
            YamlValue::Sequence(items) => Some(items.len()),
            YamlValue::Mapping(_) => value.get("chapters").and_then(YamlValue::as_sequence).map(Vec::len),
            _ => None,
        }
    }

    fn read(&self, path: &Path, kind: ArtifactKind) -> Result<String> {
        if !path.exists() {
            return Err(FolioError::ArtifactMissing { kind });
        }
        Ok(fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn load_prose(&self) -> Result<String> {
        let files = self.chapter_files()?;
        if files.is_empty() {
            return Err(FolioError::ArtifactMissing {
                kind: ArtifactKind::Prose,
            });
        }

        let chapters = files
            .iter()
            .map(|path| fs::read_to_string(path).map(|text| text.trim().to_string()))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(join_chapters(&chapters))
    }

    fn save_premise(&self, content: &str) -> Result<()> {
        let metadata = PremiseMetadata::from_generated(content)?;
        let json = serde_json::to_string_pretty(&metadata)?;
        self.write(&self.file_for(ArtifactKind::Premise), &json)
    }

    fn save_outline(&self, content: &str) -> Result<()> {
        let value: YamlValue = serde_yaml::from_str(strip_markdown_fences(content)).map_err(|e| {
            FolioError::ResponseParse {
                what: "chapter outline".to_string(),
                reason: e.to_string(),
                raw: content.to_string(),
            }
        })?;

        if !matches!(value, YamlValue::Mapping(_) | YamlValue::Sequence(_)) {
            return Err(FolioError::ResponseParse {
                what: "chapter outline".to_string(),
                reason: "expected a mapping or a list of chapters".to_string(),
                raw: content.to_string(),
            });
        }

        let yaml = serde_yaml::to_string(&value)?;
        self.write(&self.file_for(ArtifactKind::Chapters), &yaml)
    }

    fn save_prose(&self, content: &str) -> Result<()> {
        let chapters = split_chapters(content);
        if chapters.is_empty() {
            return Err(FolioError::Content("Generated prose is empty".to_string()));
        }

        let existing = self.chapter_files()?;
        let expected = if existing.is_empty() {
            self.outline_chapter_count()
        } else {
            Some(existing.len())
        };
        if let Some(expected) = expected.filter(|&n| n != chapters.len()) {
            warn!(
                "Prose has {} chapter(s) but {} were expected; saving anyway",
                chapters.len(),
                expected
            );
        }

        for path in &existing {
            fs::remove_file(path)?;
        }

        let dir = self.project_dir.join(PROSE_DIR);
        for (i, chapter) in chapters.iter().enumerate() {
            self.write(&dir.join(chapter_file_name(i + 1)), &format!("{}\n", chapter))?;
        }
        Ok(())
    }

    fn delete_prose(&self) -> Result<()> {
        for path in self.chapter_files()? {
            fs::remove_file(path)?;
        }
        let dir = self.project_dir.join(PROSE_DIR);
        if dir.is_dir() && fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
        }
        remove_if_present(&self.manuscript_path())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ContentStore for FsContentStore {
    fn exists(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Prose => self.chapter_files().map(|f| !f.is_empty()).unwrap_or(false),
            _ => self.file_for(kind).is_file(),
        }
    }

    fn load(&self, kind: ArtifactKind) -> Result<String> {
        match kind {
            ArtifactKind::Premise => {
                let raw = self.read(&self.file_for(kind), kind)?;
                let value: serde_json::Value = serde_json::from_str(&raw)?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
            ArtifactKind::Treatment | ArtifactKind::Chapters => self.read(&self.file_for(kind), kind),
            ArtifactKind::Prose => self.load_prose(),
        }
    }

    fn save(&self, kind: ArtifactKind, content: &str) -> Result<()> {
        match kind {
            ArtifactKind::Premise => self.save_premise(content),
            ArtifactKind::Treatment => self.write(&self.file_for(kind), content),
            ArtifactKind::Chapters => self.save_outline(content),
            ArtifactKind::Prose => self.save_prose(content),
        }
    }

    fn delete(&self, kind: ArtifactKind) -> Result<()> {
        match kind {
            ArtifactKind::Prose => self.delete_prose(),
            _ => remove_if_present(&self.file_for(kind)),
        }
    }

    fn refresh_derived(&self, kind: ArtifactKind) -> Result<bool> {
        if kind != ArtifactKind::Prose || !self.manuscript_path().exists() {
            return Ok(false);
        }

        let manuscript = self.load_prose()?;
        self.write(&self.manuscript_path(), &format!("{}\n", manuscript))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CHAPTER_DELIMITER;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsContentStore) {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::new(temp.path());
        (temp, store)
    }

    #[test]
    fn test_nothing_exists_in_empty_project() {
        let (_temp, store) = store();
        for kind in ArtifactKind::ALL {
            assert!(!store.exists(kind));
        }
        let err = store.load(ArtifactKind::Treatment).unwrap_err();
        assert!(matches!(err, FolioError::ArtifactMissing { kind: ArtifactKind::Treatment }));
    }

    #[test]
    fn test_treatment_round_trip() {
        let (_temp, store) = store();
        store.save(ArtifactKind::Treatment, "New treatment").unwrap();
        assert!(store.exists(ArtifactKind::Treatment));
        assert_eq!(store.load(ArtifactKind::Treatment).unwrap(), "New treatment");
    }

    #[test]
    fn test_premise_saved_as_metadata() {
        let (temp, store) = store();
        store
            .save(ArtifactKind::Premise, "```json\n{\"premise\": \"A storm\", \"themes\": [\"loss\"]}\n```")
            .unwrap();

        let raw = fs::read_to_string(temp.path().join(PREMISE_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["premise"], "A storm");

        let loaded = store.load(ArtifactKind::Premise).unwrap();
        assert!(loaded.contains("\"premise\": \"A storm\""));
    }

    #[test]
    fn test_premise_rejects_non_json() {
        let (_temp, store) = store();
        let err = store.save(ArtifactKind::Premise, "just words").unwrap_err();
        assert!(matches!(err, FolioError::ResponseParse { .. }));
        assert!(!store.exists(ArtifactKind::Premise));
    }

    #[test]
    fn test_outline_from_yaml_or_json() {
        let (_temp, store) = store();
        store
            .save(ArtifactKind::Chapters, "```yaml\nchapters:\n  - title: Arrival\n  - title: Storm\n```")
            .unwrap();
        let loaded = store.load(ArtifactKind::Chapters).unwrap();
        assert!(loaded.contains("title: Arrival"));
        assert_eq!(store.outline_chapter_count(), Some(2));

        store.save(ArtifactKind::Chapters, r#"[{"title": "Only"}]"#).unwrap();
        assert_eq!(store.outline_chapter_count(), Some(1));
    }

    #[test]
    fn test_outline_rejects_scalar() {
        let (_temp, store) = store();
        let err = store.save(ArtifactKind::Chapters, "just a sentence").unwrap_err();
        assert!(matches!(err, FolioError::ResponseParse { .. }));
    }

    #[test]
    fn test_prose_split_into_chapter_files() {
        let (temp, store) = store();
        let text = format!("One.\n{}\nTwo.\n{}\nThree.", CHAPTER_DELIMITER, CHAPTER_DELIMITER);
        store.save(ArtifactKind::Prose, &text).unwrap();

        let dir = temp.path().join(PROSE_DIR);
        assert_eq!(fs::read_to_string(dir.join("chapter-01.md")).unwrap(), "One.\n");
        assert_eq!(fs::read_to_string(dir.join("chapter-03.md")).unwrap(), "Three.\n");

        assert_eq!(
            store.load(ArtifactKind::Prose).unwrap(),
            join_chapters(&["One.".to_string(), "Two.".to_string(), "Three.".to_string()])
        );
    }

    #[test]
    fn test_prose_count_mismatch_still_saves() {
        let (temp, store) = store();
        let text = format!("One.\n{}\nTwo.\n{}\nThree.", CHAPTER_DELIMITER, CHAPTER_DELIMITER);
        store.save(ArtifactKind::Prose, &text).unwrap();

        store.save(ArtifactKind::Prose, "Only one now.").unwrap();

        let dir = temp.path().join(PROSE_DIR);
        assert!(dir.join("chapter-01.md").exists());
        assert!(!dir.join("chapter-02.md").exists());
        assert_eq!(store.load(ArtifactKind::Prose).unwrap(), "Only one now.");
    }

    #[test]
    fn test_prose_empty_is_error() {
        let (_temp, store) = store();
        assert!(store.save(ArtifactKind::Prose, "  \n").is_err());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_temp, store) = store();
        store.save(ArtifactKind::Treatment, "t").unwrap();
        store.delete(ArtifactKind::Treatment).unwrap();
        store.delete(ArtifactKind::Treatment).unwrap();
        assert!(!store.exists(ArtifactKind::Treatment));
    }

    #[test]
    fn test_delete_prose_removes_manuscript() {
        let (temp, store) = store();
        store.save(ArtifactKind::Prose, "Chapter.").unwrap();
        fs::write(temp.path().join(MANUSCRIPT_FILE), "old").unwrap();

        store.delete(ArtifactKind::Prose).unwrap();

        assert!(!store.exists(ArtifactKind::Prose));
        assert!(!temp.path().join(MANUSCRIPT_FILE).exists());
        assert!(!temp.path().join(PROSE_DIR).exists());
    }

    #[test]
    fn test_refresh_derived() {
        let (temp, store) = store();
        store.save(ArtifactKind::Prose, "First version.").unwrap();

        // no manuscript, nothing to refresh
        assert!(!store.refresh_derived(ArtifactKind::Prose).unwrap());
        assert!(!store.refresh_derived(ArtifactKind::Treatment).unwrap());

        fs::write(temp.path().join(MANUSCRIPT_FILE), "stale").unwrap();
        store.save(ArtifactKind::Prose, "Second version.").unwrap();
        assert!(store.refresh_derived(ArtifactKind::Prose).unwrap());
        assert_eq!(
            fs::read_to_string(temp.path().join(MANUSCRIPT_FILE)).unwrap(),
            "Second version.\n"
        );
    }

    #[test]
    fn test_project_name() {
        let store = FsContentStore::new("/books/lighthouse");
        assert_eq!(store.project_name(), "lighthouse");
    }
}
