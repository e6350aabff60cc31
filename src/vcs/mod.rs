//! Version control checkpoints for accepted iterations.

pub mod git;

pub use git::{GitRepo, parse_shortstat};

use crate::domain::ChangeStats;
use crate::error::Result;

/// Minimal commit interface used at the end of an iteration
pub trait VersionControl: Send + Sync {
    /// Fail if a commit cannot be made here; checked before anything is written
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Stage all changes
    fn add(&self) -> Result<()>;

    /// Commit staged changes and return the new commit id
    fn commit(&self, message: &str) -> Result<String>;

    /// Files and lines touched by a commit
    fn change_stats(&self, commit: &str) -> Result<ChangeStats>;
}

/// No-op backend for projects that are not under version control
#[derive(Debug, Clone, Copy, Default)]
pub struct Untracked;

impl VersionControl for Untracked {
    fn add(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self, _message: &str) -> Result<String> {
        Ok(String::new())
    }

    fn change_stats(&self, _commit: &str) -> Result<ChangeStats> {
        Ok(ChangeStats::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_is_inert() {
        let vcs = Untracked;
        vcs.ensure_ready().unwrap();
        vcs.add().unwrap();
        assert_eq!(vcs.commit("msg").unwrap(), "");
        assert_eq!(vcs.change_stats("").unwrap(), ChangeStats::default());
    }
}
