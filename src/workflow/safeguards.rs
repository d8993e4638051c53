//! Per-repository precondition checks.
//!
//! A violated safeguard comes back as [`Error::Safeguard`]; the executor
//! turns that into a skip for the task instead of a failure.

use crate::error::{Error, Result};
use crate::path::clean_relative_path;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::tasks::Safeguards;
use crate::workflow::template::{render, TemplateContext};
use log::debug;

fn violated(reason: impl Into<String>) -> Error {
    Error::Safeguard {
        reason: reason.into(),
    }
}

/// Whether the worktree counts as clean. When initial status capture is on,
/// the status recorded before the first node wins over the live one.
pub fn worktree_is_clean(environment: &Environment<'_>, repository: &RepositoryState) -> Result<bool> {
    if environment.options().capture_initial_worktree_status {
        if let Some(clean) = repository.initial_clean {
            return Ok(clean);
        }
    }
    environment
        .dependencies()
        .repositories
        .check_clean_worktree(&repository.path)
}

/// Checks every configured safeguard in order: clean worktree, branch, paths.
pub fn evaluate(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    safeguards: &Safeguards,
) -> Result<()> {
    if safeguards.is_empty() {
        return Ok(());
    }

    if safeguards.require_clean && !worktree_is_clean(environment, repository)? {
        return Err(violated("worktree has uncommitted changes"));
    }

    let context = TemplateContext::new(repository, environment.variables());

    if let Some(expected) = &safeguards.branch {
        let expected = render(expected, &context)?;
        let current = match &repository.current_branch {
            Some(branch) => branch.clone(),
            None => environment
                .dependencies()
                .repositories
                .current_branch(&repository.path)?,
        };
        if current != expected {
            return Err(violated(format!(
                "on branch {current}, expected {expected}"
            )));
        }
    }

    for path in &safeguards.paths {
        let relative = clean_relative_path(&render(path, &context)?)?;
        let full = repository.path.join(&relative);
        if !environment.dependencies().filesystem.exists(&full)? {
            return Err(violated(format!("required path {relative} is missing")));
        }
    }

    debug!("safeguards satisfied for {}", repository.path.display());
    Ok(())
}
