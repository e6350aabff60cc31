//! Git backend, shelling out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use super::VersionControl;
use crate::domain::ChangeStats;
use crate::error::{FolioError, Result};

/// A git working directory. Staging is scoped to this directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    workdir: PathBuf,
}

impl GitRepo {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run git with `args` in the working directory, returning trimmed stdout.
    fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| FolioError::Vcs(format!("Failed to execute git {}: {}", args[0], e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FolioError::Vcs(format!("git {} failed: {}", args[0], stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl VersionControl for GitRepo {
    fn ensure_ready(&self) -> Result<()> {
        match self.run_git(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(answer) if answer == "true" => Ok(()),
            _ => Err(FolioError::VcsUnavailable(format!(
                "{} is not inside a git work tree (run `git init` or set git.enabled: false)",
                self.workdir.display()
            ))),
        }
    }

    fn add(&self) -> Result<()> {
        self.run_git(&["add", "-A", "."])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        // An accepted revision identical to the old content still gets a checkpoint
        self.run_git(&["commit", "--allow-empty", "-m", message])?;
        let sha = self.run_git(&["rev-parse", "--short", "HEAD"])?;
        debug!("Committed {}: {}", sha, message);
        Ok(sha)
    }

    fn change_stats(&self, commit: &str) -> Result<ChangeStats> {
        let output = self.run_git(&["show", "--shortstat", "--format=", commit])?;
        Ok(parse_shortstat(&output))
    }
}

/// Parse `git show --shortstat` output, e.g.
/// ` 2 files changed, 10 insertions(+), 3 deletions(-)`.
///
/// Lines changed is insertions plus deletions. Unrecognized text yields zeros.
pub fn parse_shortstat(output: &str) -> ChangeStats {
    let mut stats = ChangeStats::default();

    for part in output.trim().split(',') {
        let mut words = part.split_whitespace();
        let Some(count) = words.next().and_then(|n| n.parse::<u64>().ok()) else {
            continue;
        };
        match words.next() {
            Some(w) if w.starts_with("file") => stats.files_changed = count,
            Some(w) if w.starts_with("insertion") || w.starts_with("deletion") => stats.lines_changed += count,
            _ => {}
        }
    }

    stats
}
