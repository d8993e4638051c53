//! # Repository Inspection
//!
//! `GitRepositoryManager` answers the questions safeguards and templates ask
//! about a working copy: is the worktree clean, which branch is checked out,
//! where does a remote point. It also rewrites remote URLs, which is the
//! only mutation it performs.
//!
//! ## Design
//!
//! The manager is a trait so the engine can be driven without a real `git`.
//! `ShellRepositoryManager` implements it on top of a shared
//! [`GitExecutor`], which means every question it answers is ultimately a
//! subprocess call that a recording executor can observe in tests.

use crate::error::{Error, Result};
use crate::git::{CommandDetails, GitExecutor};
use std::path::Path;
use std::sync::Arc;

/// Trait for repository inspection - allows mocking in tests
pub trait GitRepositoryManager: Send + Sync {
    /// Whether `git status --porcelain` reports nothing.
    fn check_clean_worktree(&self, path: &Path) -> Result<bool> {
        Ok(self.worktree_status(path)?.is_empty())
    }

    /// Porcelain status lines, one per changed path.
    fn worktree_status(&self, path: &Path) -> Result<Vec<String>>;

    /// The checked-out branch name.
    fn current_branch(&self, path: &Path) -> Result<String>;

    /// URL of `remote`, or `None` when the remote is not configured.
    fn remote_url(&self, path: &Path, remote: &str) -> Result<Option<String>>;

    /// Points `remote` at `url`.
    fn set_remote_url(&self, path: &Path, remote: &str, url: &str) -> Result<()>;
}

/// The default implementation of `GitRepositoryManager`, which shells out
/// through a [`GitExecutor`].
#[derive(Clone)]
pub struct ShellRepositoryManager {
    git: Arc<dyn GitExecutor>,
}

impl ShellRepositoryManager {
    pub fn new(git: Arc<dyn GitExecutor>) -> Self {
        Self { git }
    }

    fn git(&self, path: &Path, arguments: &[&str]) -> Result<String> {
        let details = CommandDetails::new(arguments.iter().copied()).in_directory(path);
        Ok(self.git.execute_git(&details)?.stdout)
    }
}

impl GitRepositoryManager for ShellRepositoryManager {
    fn worktree_status(&self, path: &Path) -> Result<Vec<String>> {
        let stdout = self.git(path, &["status", "--porcelain"])?;
        Ok(stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let stdout = self.git(path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = stdout.trim();
        if branch.is_empty() {
            return Err(Error::GitCommand {
                command: "rev-parse --abbrev-ref HEAD".to_string(),
                path: path.display().to_string(),
                stderr: "no branch reported".to_string(),
            });
        }
        Ok(branch.to_string())
    }

    fn remote_url(&self, path: &Path, remote: &str) -> Result<Option<String>> {
        // `git remote` never fails for a missing remote, unlike `get-url`.
        let remotes = self.git(path, &["remote"])?;
        if !remotes.lines().any(|line| line.trim() == remote) {
            return Ok(None);
        }
        let url = self.git(path, &["remote", "get-url", remote])?;
        let url = url.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }

    fn set_remote_url(&self, path: &Path, remote: &str, url: &str) -> Result<()> {
        self.git(path, &["remote", "set-url", remote, url])?;
        Ok(())
    }
}
