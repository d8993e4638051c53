//! `repo.folder.rename`: name each repository directory after its remote.

use crate::error::{Error, Result};
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use crate::workflow::safeguards::worktree_is_clean;
use std::path::PathBuf;

pub const ACTION_TYPE: &str = "repo.folder.rename";

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["include_owner", "require_clean"])?;
    let include_owner = options.bool_or("include_owner", false)?;

    if options.bool_or("require_clean", false)? && !worktree_is_clean(environment, repository)? {
        return Err(Error::Safeguard {
            reason: "worktree has uncommitted changes".to_string(),
        });
    }

    rename_repository(environment, repository, include_owner)
}

/// Where the repository should live, or `None` when its remote name is unknown.
fn target_path(repository: &RepositoryState, include_owner: bool) -> Result<Option<PathBuf>> {
    let has_remote_name = repository.metadata.is_some() || repository.remote.is_some();
    if !has_remote_name {
        return Ok(None);
    }
    let name = repository.name();
    let parent = repository.path.parent().ok_or_else(|| {
        Error::action(
            ACTION_TYPE,
            format!("{} has no parent directory", repository.path.display()),
        )
    })?;

    if !include_owner {
        return Ok(Some(parent.join(name)));
    }
    let owner = repository.owner().ok_or_else(|| {
        Error::action(
            ACTION_TYPE,
            format!("owner of {} is unknown", repository.path.display()),
        )
    })?;
    // Already inside an owner directory: rename within it.
    let parent_is_owner = parent
        .file_name()
        .map(|directory| directory.to_string_lossy() == owner.as_str())
        .unwrap_or(false);
    if parent_is_owner {
        Ok(Some(parent.join(name)))
    } else {
        Ok(Some(parent.join(owner).join(name)))
    }
}

/// Whether [`rename_repository`] would move the directory.
pub fn rename_pending(repository: &RepositoryState, include_owner: bool) -> Result<bool> {
    Ok(target_path(repository, include_owner)?.is_some_and(|target| target != repository.path))
}

/// Renames the directory and updates `repository.path`. No-op when the
/// directory already has the right name.
pub fn rename_repository(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    include_owner: bool,
) -> Result<()> {
    let Some(target) = target_path(repository, include_owner)? else {
        environment.report(&format!(
            "SKIP {}: remote repository name is unknown",
            repository.path.display()
        ));
        return Ok(());
    };
    if target == repository.path {
        return Ok(());
    }

    let filesystem = environment.dependencies().filesystem.as_ref();
    if filesystem.exists(&target)? {
        return Err(Error::action(
            ACTION_TYPE,
            format!("target {} already exists", target.display()),
        ));
    }

    if environment.dry_run() {
        environment.plan(&repository.path, &format!("rename to {}", target.display()));
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        filesystem.mkdir_all(parent)?;
    }
    filesystem.rename(&repository.path, &target)?;
    environment.report(&format!(
        "RENAMED {} -> {}",
        repository.path.display(),
        target.display()
    ));
    repository.path = target;
    Ok(())
}
