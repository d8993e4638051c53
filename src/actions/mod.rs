//! Built-in task actions.
//!
//! Each submodule exposes its action type string(s) as constants plus a
//! handler with the [`TaskAction`](crate::workflow::registry::TaskAction)
//! signature. The type strings are a stable contract: workflow files refer
//! to them by name.
//!
//! | Type | Module |
//! |---|---|
//! | `repo.folder.rename` | [`folder`] |
//! | `repo.remote.update` | [`remote`] |
//! | `repo.remote.convert-protocol` | [`remote`] |
//! | `repo.namespace.rewrite` | [`namespace`] |
//! | `repo.history.purge` | [`history`] |
//! | `repo.files.replace` | [`files`] |
//! | `repo.files.add` | [`files`] |
//! | `repo.branches.cleanup` | [`branches`] |
//! | `branch.refresh` | [`refresh`] |
//! | `repo.packages.purge` | [`packages`] |

pub mod branches;
pub mod files;
pub mod folder;
pub mod history;
pub mod namespace;
pub mod packages;
pub mod refresh;
pub mod remote;

use crate::workflow::registry::ActionRegistry;

/// Registers every built-in action.
pub fn register_builtin_actions(registry: &mut ActionRegistry) {
    registry.register(folder::ACTION_TYPE, folder::handle);
    registry.register(remote::UPDATE_ACTION_TYPE, remote::handle_update);
    registry.register(remote::CONVERT_ACTION_TYPE, remote::handle_convert);
    registry.register(namespace::ACTION_TYPE, namespace::handle);
    registry.register(history::ACTION_TYPE, history::handle);
    registry.register(files::REPLACE_ACTION_TYPE, files::handle_replace);
    registry.register(files::ADD_ACTION_TYPE, files::handle_add);
    registry.register(branches::ACTION_TYPE, branches::handle);
    registry.register(refresh::ACTION_TYPE, refresh::handle);
    registry.register(packages::ACTION_TYPE, packages::handle);
}

/// A registry holding exactly the built-in actions.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_builtin_actions(&mut registry);
    registry
}

/// Tracked files of a repository, as reported by `git ls-files`.
pub(crate) fn tracked_files(
    environment: &crate::workflow::environment::Environment<'_>,
    repository: &std::path::Path,
) -> crate::error::Result<Vec<String>> {
    Ok(environment
        .run_git(repository, &["ls-files", "-z"])?
        .stdout
        .split('\0')
        .map(str::trim)
        .filter(|file| !file.is_empty())
        .map(str::to_string)
        .collect())
}

/// Applies `rewrite` to every tracked file accepted by `select`, writing back
/// the files whose content changed. Returns the changed relative paths.
///
/// Files that are not UTF-8 are left alone. During a dry run each change is
/// planned instead of written.
pub(crate) fn rewrite_tracked_files(
    environment: &crate::workflow::environment::Environment<'_>,
    repository: &std::path::Path,
    select: impl Fn(&str) -> crate::error::Result<bool>,
    rewrite: impl Fn(&str) -> String,
) -> crate::error::Result<Vec<String>> {
    let filesystem = environment.dependencies().filesystem.as_ref();
    let mut changed = Vec::new();
    for relative in tracked_files(environment, repository)? {
        if !select(&relative)? {
            continue;
        }
        let path = repository.join(&relative);
        let Some(info) = filesystem.stat(&path)? else {
            // Tracked but deleted from the worktree.
            continue;
        };
        if info.is_dir {
            continue;
        }
        let Ok(original) = String::from_utf8(filesystem.read_file(&path)?) else {
            log::debug!("skipping non-UTF-8 file {}", path.display());
            continue;
        };
        let updated = rewrite(&original);
        if updated == original {
            continue;
        }
        if environment.dry_run() {
            environment.plan(repository, &format!("rewrite {relative}"));
        } else {
            filesystem.write_file(&path, updated.as_bytes(), info.permissions & 0o7777)?;
        }
        changed.push(relative);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::environment::{RepositoryState, RuntimeOptions};
    use crate::workflow::options::{ActionOptions, OptionMap};
    use crate::workflow::test_support::Harness;
    use std::path::PathBuf;

    #[test]
    fn test_builtin_types_are_registered() {
        let registry = builtin_registry();
        let types: Vec<&str> = registry.action_types().collect();
        assert_eq!(
            types,
            vec![
                "branch.refresh",
                "repo.branches.cleanup",
                "repo.files.add",
                "repo.files.replace",
                "repo.folder.rename",
                "repo.history.purge",
                "repo.namespace.rewrite",
                "repo.packages.purge",
                "repo.remote.convert-protocol",
                "repo.remote.update",
            ]
        );
    }

    #[test]
    fn test_minimal_options_never_panic() {
        // Every handler must answer an empty option map with Ok or a typed
        // error, never a panic.
        let registry = builtin_registry();
        let harness = Harness::new();
        let options = RuntimeOptions {
            dry_run: true,
            ..RuntimeOptions::default()
        };
        let types: Vec<String> = registry.action_types().map(str::to_string).collect();
        for action_type in types {
            let mut environment = harness.environment(&options);
            let mut repository = RepositoryState::new(PathBuf::from("/src/widgets"));
            let action_options = ActionOptions::new(action_type.clone(), OptionMap::new());
            let _ = registry.dispatch(&action_type, &mut environment, &mut repository, &action_options);
        }
        assert!(harness.git.mutating_calls().is_empty());
    }

    #[test]
    fn test_tracked_files_splits_nul_output() {
        let harness = Harness::new();
        harness.git.respond("git ls-files", "a.go\0dir/b.go\0");
        let options = RuntimeOptions::default();
        let environment = harness.environment(&options);
        let files = tracked_files(&environment, std::path::Path::new("/r")).unwrap();
        assert_eq!(files, vec!["a.go", "dir/b.go"]);
    }
}
