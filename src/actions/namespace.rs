//! `repo.namespace.rewrite`: move module and import paths to a new prefix.

use crate::actions::rewrite_tracked_files;
use crate::error::{Error, Result};
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use regex::Regex;

pub const ACTION_TYPE: &str = "repo.namespace.rewrite";

const DEFAULT_EXTENSIONS: &[&str] = &[".go", "go.mod"];

/// Matches `old` only where it ends a path segment: followed by `/`, a quote,
/// whitespace or the end of a line.
fn prefix_pattern(old: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r#"(?m){}(?P<tail>[/"'`\s]|$)"#,
        regex::escape(old)
    ))?)
}

/// `.go` style entries match a suffix; anything else names a file exactly.
fn matches_extension(relative: &str, extensions: &[String]) -> bool {
    let file_name = relative.rsplit('/').next().unwrap_or(relative);
    extensions.iter().any(|extension| {
        if extension.starts_with('.') {
            file_name.ends_with(extension.as_str())
        } else {
            file_name == extension
        }
    })
}

pub fn handle(
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    options: &ActionOptions,
) -> Result<()> {
    options.reject_unknown(&["old", "new", "extensions"])?;
    let old = options.string("old")?;
    let new = options.string("new")?;
    if old == new {
        return Err(Error::validation(ACTION_TYPE, "'old' and 'new' are identical"));
    }
    let extensions = options.string_list_or("extensions", DEFAULT_EXTENSIONS)?;
    let pattern = prefix_pattern(&old)?;
    let replacement = format!("{}${{tail}}", new.replace('$', "$$"));

    let changed = rewrite_tracked_files(
        environment,
        &repository.path,
        |relative| Ok(matches_extension(relative, &extensions)),
        |content| pattern.replace_all(content, replacement.as_str()).into_owned(),
    )?;

    if !changed.is_empty() {
        environment.report(&format!(
            "REWRITE {}: {} -> {} in {} file(s)",
            repository.path.display(),
            old,
            new,
            changed.len()
        ));
        repository.set_fact("files.changed", changed.join(","));
    }
    Ok(())
}
