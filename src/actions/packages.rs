//! `repo.packages.purge`: delete untagged container package versions.

use crate::error::{Error, Result};
use crate::github::OwnerKind;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use log::debug;

pub const ACTION_TYPE: &str = "repo.packages.purge";

const DEFAULT_PER_PAGE: u64 = 100;
const MAX_PER_PAGE: u64 = 100;

/// Ids of every untagged version, collected before anything is deleted so
/// that deletions cannot shift later pages.
fn untagged_versions(
    environment: &Environment<'_>,
    owner: &str,
    kind: OwnerKind,
    package: &str,
    per_page: u64,
) -> Result<Vec<u64>> {
    let client = environment.dependencies().packages.as_ref();
    let mut untagged = Vec::new();
    let mut page = 1;
    loop {
        let versions = client.list_versions(owner, kind, package, page, per_page)?;
        let count = versions.len() as u64;
        untagged.extend(
            versions
                .into_iter()
                .filter(|version| version.is_untagged())
                .map(|version| version.id),
        );
        if count < per_page {
            break;
        }
        page += 1;
    }
    debug!("{}/{}: {} untagged version(s) over {} page(s)", owner, package, untagged.len(), page);
    Ok(untagged)
}

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["package", "owner", "owner_type", "per_page"])?;
    let package = options.string_or("package", &repository.name())?;
    let owner = match options.optional_string("owner")?.filter(|owner| !owner.trim().is_empty()) {
        Some(owner) => owner,
        None => repository.owner().ok_or_else(|| {
            Error::validation(
                ACTION_TYPE,
                format!(
                    "option 'owner' is required: no owner known for {}",
                    repository.path.display()
                ),
            )
        })?,
    };
    let kind: OwnerKind = options.string_or("owner_type", "org")?.parse()?;
    let per_page = options.u64_or("per_page", DEFAULT_PER_PAGE)?;
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(Error::validation(
            ACTION_TYPE,
            format!("option 'per_page' must be between 1 and {MAX_PER_PAGE}"),
        ));
    }

    let untagged = untagged_versions(environment, &owner, kind, &package, per_page)?;
    let client = environment.dependencies().packages.as_ref();
    let mut deleted = 0usize;
    let mut failed = 0usize;
    for id in untagged {
        if environment.dry_run() {
            environment.plan(
                &repository.path,
                &format!("delete {owner}/{package} version {id}"),
            );
            continue;
        }
        match client.delete_version(&owner, kind, &package, id) {
            Ok(()) => deleted += 1,
            Err(error) => {
                failed += 1;
                environment.report_error(&format!(
                    "ERROR {}: delete {}/{} version {}: {}",
                    repository.path.display(),
                    owner,
                    package,
                    id,
                    error
                ));
            }
        }
    }

    if !environment.dry_run() {
        environment.report(&format!(
            "PACKAGES {}: {}/{}: deleted={} failed={}",
            repository.path.display(),
            owner,
            package,
            deleted,
            failed
        ));
    }
    if failed > 0 {
        return Err(Error::action(
            ACTION_TYPE,
            format!("{failed} of {} version deletion(s) failed", deleted + failed),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote_url::RemoteRepository;
    use crate::workflow::environment::RuntimeOptions;
    use crate::workflow::options::OptionMap;
    use crate::workflow::test_support::Harness;
    use std::path::PathBuf;

    fn options(yaml: &str) -> ActionOptions {
        let values: OptionMap = serde_yaml::from_str(yaml).unwrap();
        ActionOptions::new(ACTION_TYPE, values)
    }

    fn repository() -> RepositoryState {
        let mut state = RepositoryState::new(PathBuf::from("/src/app"));
        state.remote = RemoteRepository::parse("git@github.com:acme/app.git").ok();
        state
    }

    #[test]
    fn test_deletes_untagged_versions_across_pages() {
        let harness = Harness::new();
        harness.packages.add_page(&[(1, &["latest"]), (2, &[])]);
        harness.packages.add_page(&[(3, &[]), (4, &["v1"])]);
        harness.packages.add_page(&[(5, &[])]);
        let run = RuntimeOptions::default();
        let mut environment = harness.environment(&run);

        handle(&mut environment, &mut repository(), &options("per_page: 2")).unwrap();

        assert_eq!(harness.packages.deleted(), vec![2, 3, 5]);
        let listed = harness.packages.listed();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0], ("acme".to_string(), OwnerKind::Org, "app".to_string(), 1));
        assert!(harness
            .output
            .contents()
            .contains("PACKAGES /src/app: acme/app: deleted=3 failed=0"));
    }

    #[test]
    fn test_explicit_package_and_user_owner() {
        let harness = Harness::new();
        harness.packages.add_page(&[(9, &[])]);
        let run = RuntimeOptions::default();
        let mut environment = harness.environment(&run);

        handle(
            &mut environment,
            &mut repository(),
            &options("{ package: app/base, owner: someone, owner_type: user }"),
        )
        .unwrap();
        assert_eq!(
            harness.packages.listed()[0],
            ("someone".to_string(), OwnerKind::User, "app/base".to_string(), 1)
        );
    }

    #[test]
    fn test_failures_are_counted_and_reported() {
        let harness = Harness::new();
        harness.packages.add_page(&[(1, &[]), (2, &[]), (3, &[])]);
        harness.packages.fail_delete(2);
        let run = RuntimeOptions::default();
        let mut environment = harness.environment(&run);

        let err = handle(&mut environment, &mut repository(), &options("{}")).unwrap_err();
        assert!(err.to_string().contains("1 of 3 version deletion(s) failed"));
        assert_eq!(harness.packages.deleted(), vec![1, 3]);
        assert!(harness.errors.contents().contains("version 2"));
    }

    #[test]
    fn test_dry_run_only_lists() {
        let harness = Harness::new();
        harness.packages.add_page(&[(1, &[])]);
        let run = RuntimeOptions {
            dry_run: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&run);

        handle(&mut environment, &mut repository(), &options("{}")).unwrap();
        assert!(harness.packages.deleted().is_empty());
        assert!(harness
            .output
            .contents()
            .contains("PLAN /src/app: delete acme/app version 1"));
    }

    #[test]
    fn test_per_page_bounds() {
        let harness = Harness::new();
        let run = RuntimeOptions::default();
        let mut environment = harness.environment(&run);
        let err = handle(&mut environment, &mut repository(), &options("per_page: 500")).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_unknown_owner_is_a_validation_error() {
        let harness = Harness::new();
        let run = RuntimeOptions::default();
        let mut environment = harness.environment(&run);
        let mut state = RepositoryState::new(PathBuf::from("/src/app"));
        let err = handle(&mut environment, &mut state, &options("{}")).unwrap_err();
        assert!(err.to_string().contains("option 'owner' is required"));
    }
}
