//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Errors should tell users what went
//! wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use repo_fleet::suggestions;
//!
//! // Instead of surfacing the bare library error:
//! let nodes = compiler::build_operations(&configuration).map_err(suggestions::explain)?;
//! ```

use crate::error::Error;
use std::path::Path;

/// Turns a library error into an `anyhow` error, adding hints where the
/// error has an obvious fix.
pub fn explain(error: Error) -> anyhow::Error {
    match error {
        Error::UnsupportedCommand { key } => unsupported_command(&key),
        Error::UnknownAction { action_type } => {
            let registry = crate::actions::builtin_registry();
            let known: Vec<&str> = registry.action_types().collect();
            unknown_action(&action_type, &known)
        }
        other => anyhow::Error::new(other),
    }
}

/// Generate an error for a workflow step whose command is not supported.
///
/// Includes a "did you mean" hint and the list of supported commands.
pub fn unsupported_command(key: &str) -> anyhow::Error {
    let commands: Vec<&str> = crate::workflow::compiler::command_keys().collect();
    let did_you_mean = find_similar(key, &commands)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "unsupported workflow command: {key}{did_you_mean}\n\n\
         Supported commands are: {list}",
        list = commands.join(", ")
    )
}

/// Generate an error for a task action type no handler is registered for.
pub fn unknown_action(action_type: &str, known: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(action_type, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "unknown action type: {action_type}{did_you_mean}\n\n\
         Registered action types are: {list}",
        list = known.join(", ")
    )
}

/// Generate an error for a preset name that is not embedded in the binary.
pub fn unknown_preset(name: &str) -> anyhow::Error {
    let names: Vec<&str> = crate::presets::names().collect();
    let did_you_mean = find_similar(name, &names)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown preset: {name}{did_you_mean}\n\n\
         Available presets are: {list}\n\
         hint: Run 'repo-fleet workflow presets' to see what each one does",
        list = names.join(", ")
    )
}

/// Generate an error for a workflow file that does not exist.
pub fn workflow_file_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Workflow file not found: {path}\n\n\
         hint: Check the path given to --file\n\
         hint: Use --preset <NAME> to run an embedded workflow instead",
        path = path.display()
    )
}

/// Generate an error for a settings file that was named but does not exist.
pub fn settings_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Settings file not found: {path}\n\n\
         hint: Use --settings to specify a different path\n\
         hint: Unset the REPO_FLEET_SETTINGS environment variable to use the default location",
        path = path.display()
    )
}

/// Generate an error for a `--var` argument that is not `KEY=VALUE`.
pub fn invalid_variable(raw: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid variable assignment: {raw}\n\n\
         hint: Use --var KEY=VALUE (for example --var owner=acme)\n\
         hint: Reference it in templates as {{{{ .Environment.KEY }}}}"
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut previous: Vec<usize> = (0..=b_len).collect();
    let mut current = vec![0usize; b_len + 1];
    for i in 1..=a_len {
        current[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_len]
}
