//! Debug trace of generation attempts.
//!
//! Each iteration session gets its own timestamped directory holding every
//! raw attempt and every judge verdict. The trace is inspection data only;
//! nothing reads it back, and a failure to write it never fails an iteration.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{debug, warn};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::domain::{ArtifactKind, JudgeVerdict};

/// Writes per-attempt debug files under a trace root
#[derive(Debug, Default)]
pub struct DebugTrace {
    root: Option<PathBuf>,
    session: Option<PathBuf>,
}

impl DebugTrace {
    /// A trace that records nothing
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            session: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    /// Directory of the current session, once started
    pub fn session_dir(&self) -> Option<&Path> {
        self.session.as_deref()
    }

    /// Begin a new session directory `<root>/<YYYYMMDD_HHMMSS>_<kind>`.
    pub fn start_session(&mut self, kind: ArtifactKind) {
        let Some(root) = &self.root else {
            return;
        };

        let dir = root.join(format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), kind.as_str()));
        match fs::create_dir_all(&dir) {
            Ok(()) => {
                debug!("Debug trace session at {}", dir.display());
                self.session = Some(dir);
            }
            Err(e) => {
                warn!("Could not create trace directory {}: {}", dir.display(), e);
                self.session = None;
            }
        }
    }

    /// Record the raw content generated for `attempt`.
    pub fn record_content(&self, attempt: u32, content: &str) {
        self.write(&format!("attempt_{:02}_content.txt", attempt), content);
    }

    /// Record the judge's verdict on `attempt`.
    pub fn record_verdict(&self, attempt: u32, content: &str, verdict: &JudgeVerdict) {
        let entry = json!({
            "attempt": attempt,
            "content_sha256": hex::encode(Sha256::digest(content.as_bytes())),
            "content_chars": content.chars().count(),
            "verdict": verdict,
        });

        match serde_json::to_string_pretty(&entry) {
            Ok(text) => self.write(&format!("attempt_{:02}_judge.json", attempt), &text),
            Err(e) => warn!("Could not serialize trace verdict: {}", e),
        }
    }

    fn write(&self, name: &str, content: &str) {
        let Some(dir) = &self.session else {
            return;
        };
        let path = dir.join(name);
        if let Err(e) = fs::write(&path, content) {
            warn!("Could not write trace file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_writes_nothing() {
        let mut trace = DebugTrace::disabled();
        trace.start_session(ArtifactKind::Treatment);
        trace.record_content(1, "text");
        assert!(!trace.is_enabled());
        assert!(trace.session_dir().is_none());
    }

    #[test]
    fn test_records_attempts() {
        let temp = TempDir::new().unwrap();
        let mut trace = DebugTrace::new(temp.path());
        trace.start_session(ArtifactKind::Chapters);

        let dir = trace.session_dir().unwrap().to_path_buf();
        assert!(dir.file_name().unwrap().to_string_lossy().ends_with("_chapters"));

        trace.record_content(1, "draft one");
        trace.record_verdict(1, "draft one", &JudgeVerdict::needs_revision("too short"));

        assert_eq!(fs::read_to_string(dir.join("attempt_01_content.txt")).unwrap(), "draft one");

        let judge: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("attempt_01_judge.json")).unwrap()).unwrap();
        assert_eq!(judge["attempt"], 1);
        assert_eq!(judge["verdict"]["verdict"], "needs_revision");
        assert_eq!(judge["content_sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_unwritable_root_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        // root is a regular file, so the session dir can't be created
        let mut trace = DebugTrace::new(&blocker);
        trace.start_session(ArtifactKind::Prose);
        trace.record_content(1, "text");

        assert!(trace.session_dir().is_none());
    }
}
