//! `branch.refresh`: fetch, check out and fast-forward a branch.

use crate::error::{Error, Result};
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use log::warn;

pub const ACTION_TYPE: &str = "branch.refresh";

fn update_branch(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    remote: &str,
    branch: &str,
) -> Result<()> {
    environment.run_git(&repository.path, &["fetch", "--prune", remote])?;
    environment.run_git(&repository.path, &["checkout", branch])?;
    environment.run_git(&repository.path, &["pull", "--ff-only", remote, branch])?;
    Ok(())
}

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["branch", "remote", "stash"])?;
    let branch = options.string("branch")?;
    let remote = options.string_or("remote", "origin")?;
    let stash = options.bool_or("stash", false)?;

    let clean = environment
        .dependencies()
        .repositories
        .check_clean_worktree(&repository.path)?;
    if !clean && !stash {
        return Err(Error::action(
            ACTION_TYPE,
            format!(
                "{} has uncommitted changes (set stash: true to stash them)",
                repository.path.display()
            ),
        ));
    }

    let stashed = !clean;
    if stashed {
        let message = format!("repo-fleet: refresh {branch}");
        environment.run_git(
            &repository.path,
            &["stash", "push", "--include-untracked", "-m", message.as_str()],
        )?;
    }

    let updated = update_branch(environment, repository, &remote, &branch);

    if stashed {
        // Restore local work even when the update failed.
        if let Err(error) = environment.run_git(&repository.path, &["stash", "pop"]) {
            warn!(
                "could not restore stashed changes in {}: {}",
                repository.path.display(),
                error
            );
            updated?;
            return Err(error);
        }
    }
    updated?;

    repository.current_branch = Some(branch.clone());
    repository.set_fact("branch.checked_out", branch.clone());
    if !environment.dry_run() {
        environment.report(&format!(
            "REFRESHED {}: {}",
            repository.path.display(),
            branch
        ));
    }
    Ok(())
}
