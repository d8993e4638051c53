//! `repo.branches.cleanup`: delete the head branches of closed pull requests.
//!
//! Branch names come from `gh pr list --state closed`. Each branch that still
//! exists on the remote or locally is offered for deletion through the
//! cascading prompter. The default branch and the checked-out branch are
//! never touched.

use crate::error::{Error, Result};
use crate::github::parse_pull_requests;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use log::debug;
use std::collections::BTreeSet;

pub const ACTION_TYPE: &str = "repo.branches.cleanup";

const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CleanupSummary {
    closed: usize,
    deleted: usize,
    missing: usize,
    declined: usize,
    failed: usize,
}

/// Head branches of closed pull requests, deduplicated, in listing order.
fn closed_branches(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    limit: u64,
) -> Result<Vec<String>> {
    let limit = limit.to_string();
    let listing = environment.run_gh(
        &repository.path,
        &[
            "pr",
            "list",
            "--state",
            "closed",
            "--json",
            "headRefName,state,number",
            "--limit",
            limit.as_str(),
        ],
    )?;
    let mut seen = BTreeSet::new();
    Ok(parse_pull_requests(&listing.stdout)?
        .into_iter()
        .map(|pull_request| pull_request.head_ref_name)
        .filter(|branch| !branch.is_empty() && seen.insert(branch.clone()))
        .collect())
}

fn remote_branches(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    remote: &str,
) -> Result<BTreeSet<String>> {
    let configured = environment
        .dependencies()
        .repositories
        .remote_url(&repository.path, remote)?;
    if configured.is_none() {
        debug!("{} has no remote {}", repository.path.display(), remote);
        return Ok(BTreeSet::new());
    }
    let heads = environment.run_git(&repository.path, &["ls-remote", "--heads", remote])?;
    Ok(heads
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|reference| reference.strip_prefix("refs/heads/"))
        .map(str::to_string)
        .collect())
}

fn local_branches(
    environment: &Environment<'_>,
    repository: &RepositoryState,
) -> Result<BTreeSet<String>> {
    let branches = environment.run_git(
        &repository.path,
        &["branch", "--list", "--format=%(refname:short)"],
    )?;
    Ok(branches
        .lines()
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["remote", "limit"])?;
    let remote = options.string_or("remote", "origin")?;
    let limit = options.u64_or("limit", DEFAULT_LIMIT)?;
    if limit == 0 {
        return Err(Error::validation(ACTION_TYPE, "option 'limit' must be at least 1"));
    }

    let branches = closed_branches(environment, repository, limit)?;
    let mut summary = CleanupSummary {
        closed: branches.len(),
        ..CleanupSummary::default()
    };
    if branches.is_empty() {
        environment.report(&summary_line(repository, &summary));
        return Ok(());
    }

    let protected: Vec<String> = repository
        .default_branch()
        .map(str::to_string)
        .into_iter()
        .chain(repository.current_branch.clone())
        .collect();
    let on_remote = remote_branches(environment, repository, &remote)?;
    let on_local = local_branches(environment, repository)?;

    for branch in &branches {
        if protected.contains(branch) {
            debug!("keeping protected branch {} in {}", branch, repository.path.display());
            continue;
        }
        let remote_exists = on_remote.contains(branch);
        let local_exists = on_local.contains(branch);
        if !remote_exists && !local_exists {
            summary.missing += 1;
            continue;
        }

        let prompt = format!("Delete branch {} in {}?", branch, repository.path.display());
        if !environment.confirm(&prompt)? {
            summary.declined += 1;
            environment.report(&format!(
                "DECLINED {}: delete branch {}",
                repository.path.display(),
                branch
            ));
            continue;
        }

        let mut deletion = Ok(());
        if remote_exists {
            deletion = environment
                .run_git(&repository.path, &["push", remote.as_str(), "--delete", branch.as_str()])
                .map(|_| ());
        }
        if deletion.is_ok() && local_exists {
            deletion = environment
                .run_git(&repository.path, &["branch", "-D", branch.as_str()])
                .map(|_| ());
        }
        match deletion {
            Ok(()) => summary.deleted += 1,
            Err(error) => {
                summary.failed += 1;
                environment.report_error(&format!(
                    "ERROR {}: delete branch {}: {}",
                    repository.path.display(),
                    branch,
                    error
                ));
            }
        }
    }

    environment.report(&summary_line(repository, &summary));
    if summary.failed > 0 {
        return Err(Error::action(
            ACTION_TYPE,
            format!("{} branch deletion(s) failed", summary.failed),
        ));
    }
    Ok(())
}

fn summary_line(repository: &RepositoryState, summary: &CleanupSummary) -> String {
    format!(
        "PR-CLEANUP {}: closed={} deleted={} missing={} declined={} failed={}",
        repository.path.display(),
        summary.closed,
        summary.deleted,
        summary.missing,
        summary.declined,
        summary.failed
    )
}
