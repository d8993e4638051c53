//! Remote URL actions: canonical owner/name and protocol conversion.

use crate::error::{Error, Result};
use crate::remote_url::{Protocol, RemoteRepository};
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use log::debug;

pub const UPDATE_ACTION_TYPE: &str = "repo.remote.update";
pub const CONVERT_ACTION_TYPE: &str = "repo.remote.convert-protocol";

/// Reads and parses `remote`. `None` (after a SKIP line) when it is missing.
fn read_remote(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    remote: &str,
) -> Result<Option<(String, RemoteRepository)>> {
    let url = environment
        .dependencies()
        .repositories
        .remote_url(&repository.path, remote)?;
    let Some(url) = url else {
        environment.report(&format!(
            "SKIP {}: no remote named {}",
            repository.path.display(),
            remote
        ));
        return Ok(None);
    };
    let parsed = RemoteRepository::parse(&url)?;
    Ok(Some((url, parsed)))
}

/// Points `remote` at `new_url`, or plans it during a dry run.
fn rewrite_remote(
    environment: &Environment<'_>,
    repository: &mut RepositoryState,
    remote: &str,
    old_url: &str,
    new_url: &str,
) -> Result<()> {
    if environment.dry_run() {
        environment.plan(
            &repository.path,
            &format!("set remote {remote} {old_url} -> {new_url}"),
        );
        return Ok(());
    }

    environment
        .dependencies()
        .repositories
        .set_remote_url(&repository.path, remote, new_url)?;
    environment.report(&format!(
        "UPDATED {}: {} {} -> {}",
        repository.path.display(),
        remote,
        old_url,
        new_url
    ));
    if remote == "origin" {
        repository.remote_url = Some(new_url.to_string());
        repository.remote = RemoteRepository::parse(new_url).ok();
    }
    Ok(())
}

pub fn handle_update(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["remote", "owner"])?;
    let remote = options.string_or("remote", "origin")?;
    let expected_owner = options
        .optional_string("owner")?
        .filter(|owner| !owner.trim().is_empty());

    let Some((url, parsed)) = read_remote(environment, repository, &remote)? else {
        return Ok(());
    };

    let metadata = match (&repository.metadata, remote.as_str()) {
        (Some(metadata), "origin") => metadata.clone(),
        _ => environment
            .dependencies()
            .github
            .resolve_repo_metadata(&parsed.full_name())?,
    };

    if let Some(expected) = expected_owner {
        if !metadata.owner().eq_ignore_ascii_case(&expected) {
            return Err(Error::action(
                UPDATE_ACTION_TYPE,
                format!(
                    "canonical owner {} does not match expected owner {}",
                    metadata.owner(),
                    expected
                ),
            ));
        }
    }

    if metadata.name_with_owner == parsed.full_name() {
        debug!("{} already points at {}", remote, metadata.name_with_owner);
        return Ok(());
    }

    let canonical = parsed
        .with_full_name(&metadata.name_with_owner)
        .ok_or_else(|| {
            Error::action(
                UPDATE_ACTION_TYPE,
                format!("unexpected repository name {}", metadata.name_with_owner),
            )
        })?;
    let new_url = canonical.to_url(parsed.protocol);
    rewrite_remote(environment, repository, &remote, &url, &new_url)
}

pub fn handle_convert(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["from", "to", "remote"])?;
    let from: Protocol = options.string("from")?.parse()?;
    let to: Protocol = options.string("to")?.parse()?;
    if from == to {
        return Err(Error::validation(
            CONVERT_ACTION_TYPE,
            format!("'from' and 'to' are both {from}"),
        ));
    }
    let remote = options.string_or("remote", "origin")?;
    convert_protocol(environment, repository, &remote, from, to)
}

/// Whether `remote` exists and currently uses `from`.
pub fn protocol_conversion_pending(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    remote: &str,
    from: Protocol,
) -> Result<bool> {
    let url = environment
        .dependencies()
        .repositories
        .remote_url(&repository.path, remote)?;
    match url {
        Some(url) => Ok(RemoteRepository::parse(&url)?.protocol == from),
        None => Ok(false),
    }
}

/// Rewrites `remote` from `from` to `to`; remotes on other protocols are left alone.
pub fn convert_protocol(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    remote: &str,
    from: Protocol,
    to: Protocol,
) -> Result<()> {
    let Some((url, parsed)) = read_remote(environment, repository, remote)? else {
        return Ok(());
    };
    if parsed.protocol != from {
        debug!(
            "{} remote {} uses {}, not {}",
            repository.path.display(),
            remote,
            parsed.protocol,
            from
        );
        return Ok(());
    }
    let new_url = parsed.to_url(to);
    rewrite_remote(environment, repository, remote, &url, &new_url)
}
