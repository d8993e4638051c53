//! # Task Definitions
//!
//! A task is the unit of work most workflow steps compile into: an optional
//! branch to work on, files to seed, registry-dispatched actions, an optional
//! commit, and the safeguards that gate all of it on a given repository.
//!
//! The structs here are serde-derived so that a `tasks apply` step read from
//! YAML and one built programmatically through
//! [`TasksApplyDefinition::options`] share a single wire shape:
//!
//! ```yaml
//! tasks:
//!   - name: Add license
//!     ensure_clean: true
//!     branch: { name: "license/{{ .Repository.Name }}", start_point: main, push_remote: origin }
//!     files:
//!       - { path: LICENSE, content: "...", mode: skip-if-exists, permissions: "0644" }
//!     commit: { message: "Add LICENSE" }
//!     actions:
//!       - { type: repo.files.replace, options: { find: a, replace: b } }
//!     safeguards: { require_clean: true, branch: main, paths: [go.mod] }
//! ```

use crate::error::{Error, Result};
use crate::path::clean_relative_path;
use crate::workflow::options::OptionMap;
use crate::workflow::template;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::fmt;

fn is_false(value: &bool) -> bool {
    !*value
}

/// How a seeded file treats an existing file at the same path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileMode {
    /// Replace the existing content.
    #[default]
    Overwrite,
    /// Leave an existing file untouched.
    SkipIfExists,
}

impl FileMode {
    fn is_default(&self) -> bool {
        *self == FileMode::Overwrite
    }
}

/// Unix permission bits for a seeded file, written as an octal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePermissions(u32);

impl FilePermissions {
    /// Regular, non-executable file.
    pub const DEFAULT: FilePermissions = FilePermissions(0o644);

    /// Parses `"0644"`, `"644"` or `"0o644"`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
        let bits = u32::from_str_radix(digits, 8).map_err(|_| {
            Error::validation("file", format!("permissions must be octal, got '{trimmed}'"))
        })?;
        if bits > 0o7777 {
            return Err(Error::validation(
                "file",
                format!("permissions out of range: '{trimmed}'"),
            ));
        }
        Ok(FilePermissions(bits))
    }

    /// The raw permission bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for FilePermissions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FilePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Serialize for FilePermissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FilePermissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // YAML reads unquoted 0644 as 644 and 0o644 as 420; the original
        // spelling is gone by then, so only strings are accepted.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => FilePermissions::parse(&text).map_err(serde::de::Error::custom),
            Raw::Number(number) => Err(serde::de::Error::custom(format!(
                "permissions must be a quoted octal string such as \"0644\", got {number}"
            ))),
        }
    }
}

/// Branch a task works on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskBranchDefinition {
    /// Branch name template; empty means "stay on the current branch".
    #[serde(rename = "name", default, skip_serializing_if = "String::is_empty")]
    pub name_template: String,
    /// Start point template used when the branch is created.
    #[serde(rename = "start_point", default, skip_serializing_if = "String::is_empty")]
    pub start_point_template: String,
    /// Remote to push the branch to after committing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_remote: Option<String>,
}

impl TaskBranchDefinition {
    /// True when nothing about the branch is configured.
    pub fn is_empty(&self) -> bool {
        self.name_template.is_empty()
            && self.start_point_template.is_empty()
            && self.push_remote.is_none()
    }
}

/// A file seeded into every repository the task runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFileDefinition {
    /// Repository-relative path template.
    #[serde(rename = "path")]
    pub path_template: String,
    /// File content template.
    #[serde(rename = "content", default)]
    pub content_template: String,
    #[serde(default, skip_serializing_if = "FileMode::is_default")]
    pub mode: FileMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<FilePermissions>,
}

/// Commit created after a task's files and actions ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCommitDefinition {
    #[serde(rename = "message", default, skip_serializing_if = "String::is_empty")]
    pub message_template: String,
}

impl TaskCommitDefinition {
    pub fn is_empty(&self) -> bool {
        self.message_template.is_empty()
    }
}

/// One registry-dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskActionDefinition {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "OptionMap::is_empty")]
    pub options: OptionMap,
}

impl TaskActionDefinition {
    pub fn new(action_type: impl Into<String>, options: OptionMap) -> Self {
        Self {
            action_type: action_type.into(),
            options,
        }
    }
}

/// Declarative preconditions gating a task on a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Safeguards {
    /// The worktree must have no uncommitted changes.
    #[serde(default, skip_serializing_if = "is_false")]
    pub require_clean: bool,
    /// The checked-out branch must equal this (template) value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Every listed repository-relative path (templates) must exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl Safeguards {
    pub fn is_empty(&self) -> bool {
        !self.require_clean && self.branch.is_none() && self.paths.is_empty()
    }
}

/// An ordered bundle of repository mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ensure_clean: bool,
    #[serde(default, skip_serializing_if = "TaskBranchDefinition::is_empty")]
    pub branch: TaskBranchDefinition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<TaskFileDefinition>,
    #[serde(default, skip_serializing_if = "TaskCommitDefinition::is_empty")]
    pub commit: TaskCommitDefinition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<TaskActionDefinition>,
    #[serde(default, skip_serializing_if = "Safeguards::is_empty")]
    pub safeguards: Safeguards,
}

impl TaskDefinition {
    /// A task with the given name and nothing else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Safeguards with `ensure_clean` folded into `require_clean`.
    pub fn effective_safeguards(&self) -> Safeguards {
        let mut safeguards = self.safeguards.clone();
        safeguards.require_clean |= self.ensure_clean;
        safeguards
    }

    /// Whether running this task can change a repository.
    pub fn is_mutating(&self) -> bool {
        !self.branch.name_template.is_empty()
            || !self.files.is_empty()
            || !self.actions.is_empty()
            || !self.commit.is_empty()
    }

    /// Shape checks that do not need a repository.
    pub fn validate(&self) -> Result<()> {
        let context = if self.name.is_empty() {
            "task".to_string()
        } else {
            format!("task '{}'", self.name)
        };

        if self.name.trim().is_empty() {
            return Err(Error::validation(context, "task name is required"));
        }
        if !self.is_mutating() {
            return Err(Error::validation(
                context,
                "task must define a branch, files, actions or a commit",
            ));
        }
        if self.branch.push_remote.is_some() && self.branch.name_template.is_empty() {
            return Err(Error::validation(
                context,
                "branch.push_remote requires branch.name",
            ));
        }

        for file in &self.files {
            validate_file_path_template(&context, &file.path_template)?;
        }

        for action in &self.actions {
            if action.action_type.trim().is_empty() {
                return Err(Error::validation(context, "action type is required"));
            }
        }

        Ok(())
    }
}

/// Checks a file path template before rendering. Fully literal paths are
/// cleaned now; templated paths are re-checked after rendering.
fn validate_file_path_template(context: &str, path_template: &str) -> Result<()> {
    let trimmed = path_template.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(context, "file path is required"));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(Error::validation(
            context,
            format!("file path must be relative: {trimmed}"),
        ));
    }
    if !template::contains_placeholder(trimmed) {
        clean_relative_path(trimmed)
            .map_err(|error| Error::validation(context, error.to_string()))?;
    }
    Ok(())
}

/// Options payload of a `tasks apply` step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TasksApplyDefinition {
    pub tasks: Vec<TaskDefinition>,
}

impl TasksApplyDefinition {
    pub fn new(tasks: Vec<TaskDefinition>) -> Self {
        Self { tasks }
    }

    /// Serializes into the option tree a `tasks apply` step expects.
    pub fn options(&self) -> Result<OptionMap> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(map) => Ok(map),
            _ => Err(Error::validation(
                "tasks apply",
                "task definitions did not serialize to a mapping",
            )),
        }
    }

    /// Reads and validates the option tree of a `tasks apply` step.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let definition: TasksApplyDefinition =
            serde_yaml::from_value(Value::Mapping(options.clone()))
                .map_err(|error| Error::validation("tasks apply", error.to_string()))?;

        if definition.tasks.is_empty() {
            return Err(Error::validation(
                "tasks apply",
                "at least one task is required",
            ));
        }
        for task in &definition.tasks {
            task.validate()?;
        }
        Ok(definition)
    }
}
