//! File actions: literal find/replace across tracked files, and seeding a file.

use crate::actions::rewrite_tracked_files;
use crate::error::{Error, Result};
use crate::path::glob_match_any;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use crate::workflow::task_runner::write_task_file;
use crate::workflow::tasks::TaskFileDefinition;
use serde_yaml::Value;

pub const REPLACE_ACTION_TYPE: &str = "repo.files.replace";
pub const ADD_ACTION_TYPE: &str = "repo.files.add";

pub fn handle_replace(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["find", "replace", "patterns"])?;
    let find = options.string("find")?;
    let replace = options.optional_string("replace")?.unwrap_or_default();
    let patterns = options.string_list_or("patterns", &["**/*"])?;

    let changed = rewrite_tracked_files(
        environment,
        &repository.path,
        |relative| glob_match_any(&patterns, relative),
        |content| content.replace(find.as_str(), replace.as_str()),
    )?;

    if !changed.is_empty() {
        environment.report(&format!(
            "REPLACED {}: {} file(s)",
            repository.path.display(),
            changed.len()
        ));
        repository.set_fact("files.changed", changed.join(","));
    }
    Ok(())
}

pub fn handle_add(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    let file: TaskFileDefinition =
        serde_yaml::from_value(Value::Mapping(options.values().clone()))
            .map_err(|error| Error::validation(ADD_ACTION_TYPE, error.to_string()))?;
    if file.path_template.trim().is_empty() {
        return Err(Error::validation(ADD_ACTION_TYPE, "option 'path' is required"));
    }
    write_task_file(environment, repository, &file)
}
