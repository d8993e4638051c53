//! `repo.history.purge`: drop paths from every commit with `git filter-repo`.

use crate::error::Result;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use log::{debug, info};

pub const ACTION_TYPE: &str = "repo.history.purge";

/// Keeps the paths that appear in at least one commit on any ref.
fn paths_with_history(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    paths: &[String],
) -> Result<Vec<String>> {
    let mut found = Vec::new();
    for path in paths {
        let log = environment.run_git(
            &repository.path,
            &["log", "--all", "--format=%H", "-n", "1", "--", path.as_str()],
        )?;
        if log.stdout.trim().is_empty() {
            debug!("{} has no history in {}", path, repository.path.display());
        } else {
            found.push(path.clone());
        }
    }
    Ok(found)
}

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["paths", "remote", "push"])?;
    let paths = options.required_string_list("paths")?;
    let remote = options.string_or("remote", "origin")?;
    let push = options.bool_or("push", true)?;

    let targets = paths_with_history(environment, repository, &paths)?;
    if targets.is_empty() {
        environment.report(&format!(
            "SKIP {}: {}: no history for {}",
            repository.path.display(),
            ACTION_TYPE,
            paths.join(", ")
        ));
        return Ok(());
    }

    // filter-repo drops remotes; remember where this one pointed.
    let remote_url = environment
        .dependencies()
        .repositories
        .remote_url(&repository.path, &remote)?;

    let mut arguments = vec!["filter-repo", "--invert-paths", "--force"];
    for path in &targets {
        arguments.push("--path");
        arguments.push(path.as_str());
    }
    environment.run_git(&repository.path, &arguments)?;

    if let Some(url) = &remote_url {
        let still_present = environment.dry_run()
            || environment
                .dependencies()
                .repositories
                .remote_url(&repository.path, &remote)?
                .is_some();
        if !still_present {
            info!("restoring remote {} for {}", remote, repository.path.display());
            environment.run_git(&repository.path, &["remote", "add", remote.as_str(), url.as_str()])?;
        }
    }

    if push {
        if remote_url.is_some() {
            environment.run_git(&repository.path, &["push", "--force", "--all", remote.as_str()])?;
            environment.run_git(&repository.path, &["push", "--force", "--tags", remote.as_str()])?;
        } else {
            debug!("no remote {}; not pushing rewritten history", remote);
        }
    }

    if !environment.dry_run() {
        environment.report(&format!(
            "PURGED {}: {}",
            repository.path.display(),
            targets.join(", ")
        ));
    }
    Ok(())
}
