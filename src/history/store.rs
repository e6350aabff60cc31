//! File-backed iteration history for one (project, artifact kind) pair.
//!
//! The backing file is a pretty-printed JSON array of `IterationRecord`s.
//! Records are only ever appended; the file is rewritten in full through a
//! temp file + rename so a crash never leaves a half-written array behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};

use crate::domain::{ArtifactKind, ChangeStats, IterationRecord, RecordedVerdict};
use crate::error::{FolioError, Result};
use crate::text::{preview, truncate_chars};

/// Directory (relative to the project) holding history files
pub const HISTORY_DIR: &str = ".folio/history";

/// Default cap on a stored semantic summary
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 500;

/// Default per-entry preview length in `summary()`
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Feedback and summary of a past iteration, as fed back to the LLM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryContext {
    pub feedback: String,
    pub semantic_summary: String,
}

/// Everything the coordinator knows about a finished iteration
#[derive(Debug, Clone)]
pub struct NewIteration {
    pub feedback: String,
    pub judge_attempts: u32,
    pub judge_verdict: RecordedVerdict,
    pub judge_reasoning: String,
    pub semantic_summary: String,
    pub commit_sha: String,
    pub stats: ChangeStats,
}

/// Append-only history of iterations on one artifact
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    records: Vec<IterationRecord>,
    summary_max_chars: usize,
    preview_chars: usize,
}

impl HistoryStore {
    /// Open (and load) the history for `kind` in `project_dir`.
    pub fn open(project_dir: &Path, kind: ArtifactKind) -> Self {
        Self::at_path(Self::path_for(project_dir, kind))
    }

    /// Open a history backed by an explicit file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            records: Vec::new(),
            summary_max_chars: DEFAULT_SUMMARY_MAX_CHARS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        };
        store.load();
        store
    }

    /// Set the stored-summary cap and the preview length.
    pub fn with_limits(mut self, summary_max_chars: usize, preview_chars: usize) -> Self {
        self.summary_max_chars = summary_max_chars;
        self.preview_chars = preview_chars;
        self
    }

    /// Location of the history file for `kind`.
    pub fn path_for(project_dir: &Path, kind: ArtifactKind) -> PathBuf {
        project_dir.join(HISTORY_DIR).join(format!("{}.json", kind.as_str()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// (Re)load records from disk.
    ///
    /// A missing or corrupt file loads as an empty history.
    pub fn load(&mut self) -> &[IterationRecord] {
        self.records = read_records(&self.path);
        &self.records
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record and flush it to disk.
    ///
    /// All-or-nothing: the in-memory history only changes once the file has
    /// been replaced successfully.
    pub fn add_iteration(&mut self, entry: NewIteration) -> Result<&IterationRecord> {
        let record = IterationRecord {
            timestamp: Utc::now(),
            feedback: entry.feedback,
            judge_attempts: entry.judge_attempts,
            judge_verdict: entry.judge_verdict,
            judge_reasoning: entry.judge_reasoning,
            semantic_summary: truncate_chars(&entry.semantic_summary, self.summary_max_chars),
            commit_sha: entry.commit_sha,
            files_changed: entry.stats.files_changed,
            lines_changed: entry.stats.lines_changed,
        };

        let mut updated = self.records.clone();
        updated.push(record);
        self.flush(&updated)?;
        self.records = updated;

        debug!("Appended iteration #{} to {}", self.records.len(), self.path.display());
        self.records
            .last()
            .ok_or_else(|| FolioError::History("record vanished after append".to_string()))
    }

    /// Feedback/summary pairs in chronological order, for prompt continuity.
    pub fn context_for_llm(&self) -> Vec<HistoryContext> {
        self.records
            .iter()
            .map(|r| HistoryContext {
                feedback: r.feedback.clone(),
                semantic_summary: r.semantic_summary.clone(),
            })
            .collect()
    }

    /// Human-readable listing, one entry per iteration.
    pub fn summary(&self) -> String {
        if self.records.is_empty() {
            return "No previous iterations.".to_string();
        }

        let mut out = format!("{} previous iteration(s):\n", self.records.len());
        for (i, record) in self.records.iter().enumerate() {
            out.push_str(&format!(
                "{}. [{}] {} ({} attempt(s), {})\n",
                i + 1,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                preview(&record.feedback, self.preview_chars),
                record.judge_attempts,
                record.judge_verdict,
            ));
            if !record.semantic_summary.is_empty() {
                out.push_str(&format!(
                    "   {}\n",
                    preview(&record.semantic_summary, self.preview_chars)
                ));
            }
        }
        out
    }

    fn flush(&self, records: &[IterationRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            FolioError::History(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

fn read_records(path: &Path) -> Vec<IterationRecord> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read history {}: {}; starting fresh", path.display(), e);
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            warn!("History {} is corrupt ({}); starting fresh", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(feedback: &str, summary: &str) -> NewIteration {
        NewIteration {
            feedback: feedback.to_string(),
            judge_attempts: 1,
            judge_verdict: RecordedVerdict::Approved,
            judge_reasoning: "Addresses the feedback".to_string(),
            semantic_summary: summary.to_string(),
            commit_sha: "abc1234".to_string(),
            stats: ChangeStats {
                files_changed: 1,
                lines_changed: 8,
            },
        }
    }

    #[test]
    fn test_open_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = HistoryStore::open(temp.path(), ArtifactKind::Treatment);
        assert!(store.is_empty());
        assert_eq!(store.count(), 0);
        assert!(store.path().ends_with(".folio/history/treatment.json"));
    }

    #[test]
    fn test_add_persists() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = HistoryStore::open(temp.path(), ArtifactKind::Premise);
            store.add_iteration(entry("Darker tone", "Tone shifted")).unwrap();
            store.add_iteration(entry("Add a twist", "Twist added")).unwrap();
        }

        let store = HistoryStore::open(temp.path(), ArtifactKind::Premise);
        assert_eq!(store.count(), 2);
        assert_eq!(store.records()[0].feedback, "Darker tone");
        assert_eq!(store.records()[1].feedback, "Add a twist");
        assert_eq!(store.records()[1].files_changed, 1);
        assert_eq!(store.records()[1].lines_changed, 8);
    }

    #[test]
    fn test_file_is_json_array() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Prose);
        store.add_iteration(entry("Shorter chapters", "Split chapter 3")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["judge_verdict"], "approved");
        assert_eq!(array[0]["commit_sha"], "abc1234");
    }

    #[test]
    fn test_existing_records_unchanged_by_append() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Treatment);
        store.add_iteration(entry("first", "one")).unwrap();
        let first = store.records()[0].clone();

        store.add_iteration(entry("second", "two")).unwrap();

        assert_eq!(store.records()[0], first);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let temp = TempDir::new().unwrap();
        let path = HistoryStore::path_for(temp.path(), ArtifactKind::Chapters);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[{\"feedback\": ").unwrap();

        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Chapters);
        assert!(store.is_empty());

        // and can still be appended to
        store.add_iteration(entry("recover", "fresh start")).unwrap();
        assert_eq!(HistoryStore::open(temp.path(), ArtifactKind::Chapters).count(), 1);
    }

    #[test]
    fn test_failed_flush_leaves_memory_unchanged() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = temp.path().join("blocked.json");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut store = HistoryStore::at_path(&path);
        let result = store.add_iteration(entry("will fail", "nope"));

        assert!(result.is_err());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_summary_is_truncated_for_storage() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Treatment).with_limits(20, 100);
        let long = "x".repeat(100);
        let record = store.add_iteration(entry("feedback", &long)).unwrap();
        assert_eq!(record.semantic_summary, format!("{}...", "x".repeat(20)));
    }

    #[test]
    fn test_context_for_llm() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Treatment);
        store.add_iteration(entry("More dialogue", "Dialogue expanded")).unwrap();

        let context = store.context_for_llm();
        assert_eq!(
            context,
            vec![HistoryContext {
                feedback: "More dialogue".to_string(),
                semantic_summary: "Dialogue expanded".to_string(),
            }]
        );
    }

    #[test]
    fn test_summary_preview() {
        let temp = TempDir::new().unwrap();
        let mut store = HistoryStore::open(temp.path(), ArtifactKind::Treatment).with_limits(500, 10);
        assert_eq!(store.summary(), "No previous iterations.");

        store
            .add_iteration(entry("Make the villain far more sympathetic", "Villain backstory"))
            .unwrap();
        let summary = store.summary();
        assert!(summary.starts_with("1 previous iteration(s):"));
        assert!(summary.contains("Make the v..."));
        assert!(summary.contains("approved"));
    }
}
