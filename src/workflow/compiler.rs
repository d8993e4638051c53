//! # Operation Compiler
//!
//! Turns a parsed [`Configuration`] into an ordered list of
//! [`OperationNode`]s. Each step's command words are joined with a single
//! space to form a key that is looked up in a fixed dispatch table; the
//! matching entry validates the step's options and builds the operation.
//!
//! Most entries compile into a [`TaskOperation`] holding one task with one
//! registry-dispatched action. Two legacy commands keep dedicated
//! operations (`folder rename`, `remote update-protocol`).
//!
//! Single-action commands accept a few task-level keys next to the action's
//! own options: `require_clean`, `branch`, `start_point`, `push_remote` and
//! `commit_message`. These are split off into the task and never reach the
//! handler.

use crate::config::{Configuration, StepConfiguration};
use crate::error::{Error, Result};
use crate::remote_url::Protocol;
use crate::workflow::options::{ActionOptions, OptionMap};
use crate::workflow::tasks::{
    TaskActionDefinition, TaskDefinition, TaskFileDefinition, TasksApplyDefinition,
};
use crate::workflow::template;
use serde_yaml::Value;

/// Tasks compiled from a step.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOperation {
    pub tasks: Vec<TaskDefinition>,
}

/// Renames every repository directory after its remote repository name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenameFoldersOperation {
    pub include_owner: bool,
    pub require_clean: bool,
}

/// Rewrites a remote from one URL protocol to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConversionOperation {
    pub remote: String,
    pub from: Protocol,
    pub to: Protocol,
}

/// What a node does to each repository.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Tasks(TaskOperation),
    RenameFolders(RenameFoldersOperation),
    ProtocolConversion(ProtocolConversionOperation),
}

impl Operation {
    /// Whether repositories must be processed children-first for this
    /// operation to be safe (anything that renames directories).
    pub fn requires_descending_depth(&self) -> bool {
        match self {
            Operation::RenameFolders(_) => true,
            Operation::ProtocolConversion(_) => false,
            Operation::Tasks(operation) => operation
                .tasks
                .iter()
                .flat_map(|task| &task.actions)
                .any(|action| action.action_type == crate::actions::folder::ACTION_TYPE),
        }
    }

    /// Every action type the operation dispatches through the registry.
    pub fn action_types(&self) -> Vec<&str> {
        match self {
            Operation::Tasks(operation) => operation
                .tasks
                .iter()
                .flat_map(|task| &task.actions)
                .map(|action| action.action_type.as_str())
                .collect(),
            Operation::RenameFolders(_) | Operation::ProtocolConversion(_) => Vec::new(),
        }
    }
}

/// One compiled step.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationNode {
    pub name: String,
    pub command_key: String,
    pub operation: Operation,
}

type CompileFn = fn(&StepConfiguration) -> Result<Operation>;

const DISPATCH_TABLE: &[(&str, CompileFn)] = &[
    ("tasks apply", compile_tasks_apply),
    ("folder rename", compile_folder_rename),
    ("remote update-protocol", compile_protocol_conversion),
    ("remote update-to-canonical", compile_remote_canonical),
    ("namespace rewrite", compile_namespace_rewrite),
    ("history purge", compile_history_purge),
    ("files replace", compile_files_replace),
    ("files add", compile_files_add),
    ("license apply", compile_license_apply),
    ("prs cleanup", compile_prs_cleanup),
    ("branch refresh", compile_branch_refresh),
    ("packages purge", compile_packages_purge),
];

/// Every supported command key, in table order.
pub fn command_keys() -> impl Iterator<Item = &'static str> {
    DISPATCH_TABLE.iter().map(|(key, _)| *key)
}

/// The dispatch key for a command path.
pub fn command_key(command: &[String]) -> String {
    command.join(" ")
}

/// Compiles every step, preserving order.
pub fn build_operations(configuration: &Configuration) -> Result<Vec<OperationNode>> {
    configuration
        .steps
        .iter()
        .map(|step| {
            let key = command_key(&step.command);
            let (_, compile) = DISPATCH_TABLE
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .ok_or_else(|| Error::UnsupportedCommand { key: key.clone() })?;
            Ok(OperationNode {
                name: step.display_name(),
                operation: compile(step)?,
                command_key: key,
            })
        })
        .collect()
}

const TASK_KEYS: &[&str] = &[
    "require_clean",
    "branch",
    "start_point",
    "push_remote",
    "commit_message",
];

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Sequence(items) => items.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

/// Splits the task-level keys in `task_keys` off a step's options and
/// returns the task shell plus the remaining options.
fn split_task_options(
    step: &StepConfiguration,
    task_keys: &[&str],
) -> Result<(TaskDefinition, OptionMap)> {
    let key = command_key(&step.command);
    let mut task_options = OptionMap::new();
    let mut remaining = OptionMap::new();
    for (name, value) in &step.options {
        let is_task_key = name
            .as_str()
            .map(|name| task_keys.contains(&name))
            .unwrap_or(false);
        if is_task_key {
            task_options.insert(name.clone(), value.clone());
        } else {
            remaining.insert(name.clone(), value.clone());
        }
    }

    let options = ActionOptions::new(key, task_options);
    let mut task = TaskDefinition::named(step.display_name());
    task.safeguards.require_clean = options.bool_or("require_clean", false)?;
    task.branch.name_template = options.string_or("branch", "")?;
    task.branch.start_point_template = options.string_or("start_point", "")?;
    task.branch.push_remote = options
        .optional_string("push_remote")?
        .filter(|remote| !remote.trim().is_empty());
    task.commit.message_template = options.string_or("commit_message", "")?;
    Ok((task, remaining))
}

/// Checks a single action's options: no unknown keys, required keys present.
fn check_action_options(
    action_type: &str,
    options: &OptionMap,
    allowed: &[&str],
    required: &[&str],
) -> Result<()> {
    ActionOptions::new(action_type, options.clone()).reject_unknown(allowed)?;
    for key in required {
        if options.get(*key).map(is_blank).unwrap_or(true) {
            return Err(Error::validation(
                action_type,
                format!("option '{key}' is required"),
            ));
        }
    }
    Ok(())
}

fn single_action(
    step: &StepConfiguration,
    action_type: &str,
    allowed: &[&str],
    required: &[&str],
    task_keys: &[&str],
) -> Result<Operation> {
    let (mut task, options) = split_task_options(step, task_keys)?;
    check_action_options(action_type, &options, allowed, required)?;
    task.actions.push(TaskActionDefinition::new(action_type, options));
    task.validate()?;
    Ok(Operation::Tasks(TaskOperation { tasks: vec![task] }))
}

fn compile_tasks_apply(step: &StepConfiguration) -> Result<Operation> {
    let definition = TasksApplyDefinition::from_options(&step.options)?;
    Ok(Operation::Tasks(TaskOperation {
        tasks: definition.tasks,
    }))
}

fn compile_folder_rename(step: &StepConfiguration) -> Result<Operation> {
    let options = ActionOptions::new("folder rename", step.options.clone());
    options.reject_unknown(&["include_owner", "require_clean"])?;
    Ok(Operation::RenameFolders(RenameFoldersOperation {
        include_owner: options.bool_or("include_owner", false)?,
        require_clean: options.bool_or("require_clean", false)?,
    }))
}

fn compile_protocol_conversion(step: &StepConfiguration) -> Result<Operation> {
    let options = ActionOptions::new("remote update-protocol", step.options.clone());
    options.reject_unknown(&["from", "to", "remote"])?;
    let from: Protocol = options.string("from")?.parse()?;
    let to: Protocol = options.string("to")?.parse()?;
    if from == to {
        return Err(Error::validation(
            "remote update-protocol",
            format!("'from' and 'to' are both {from}"),
        ));
    }
    Ok(Operation::ProtocolConversion(ProtocolConversionOperation {
        remote: options.string_or("remote", "origin")?,
        from,
        to,
    }))
}

fn compile_remote_canonical(step: &StepConfiguration) -> Result<Operation> {
    single_action(
        step,
        crate::actions::remote::UPDATE_ACTION_TYPE,
        &["remote", "owner"],
        &[],
        &["require_clean"],
    )
}

fn compile_namespace_rewrite(step: &StepConfiguration) -> Result<Operation> {
    single_action(
        step,
        crate::actions::namespace::ACTION_TYPE,
        &["old", "new", "extensions"],
        &["old", "new"],
        TASK_KEYS,
    )
}

fn compile_history_purge(step: &StepConfiguration) -> Result<Operation> {
    single_action(
        step,
        crate::actions::history::ACTION_TYPE,
        &["paths", "remote", "push"],
        &["paths"],
        &["require_clean"],
    )
}

fn compile_files_replace(step: &StepConfiguration) -> Result<Operation> {
    let (mut task, options) = split_task_options(step, TASK_KEYS)?;
    let action_type = crate::actions::files::REPLACE_ACTION_TYPE;
    check_action_options(action_type, &options, &["find", "replace", "patterns"], &["find"])?;
    if !options.contains_key("replace") {
        return Err(Error::validation(action_type, "option 'replace' is required"));
    }
    task.actions.push(TaskActionDefinition::new(action_type, options));
    task.validate()?;
    Ok(Operation::Tasks(TaskOperation { tasks: vec![task] }))
}

/// Builds a file entry from the remaining step options.
fn file_definition(context: &str, options: OptionMap) -> Result<TaskFileDefinition> {
    serde_yaml::from_value(Value::Mapping(options))
        .map_err(|error| Error::validation(context, error.to_string()))
}

fn compile_files_add(step: &StepConfiguration) -> Result<Operation> {
    let (mut task, options) = split_task_options(step, TASK_KEYS)?;
    check_action_options(
        "files add",
        &options,
        &["path", "content", "mode", "permissions"],
        &["path"],
    )?;
    task.files.push(file_definition("files add", options)?);
    task.validate()?;
    Ok(Operation::Tasks(TaskOperation { tasks: vec![task] }))
}

fn compile_license_apply(step: &StepConfiguration) -> Result<Operation> {
    let (mut task, mut options) = split_task_options(step, TASK_KEYS)?;
    check_action_options(
        "license apply",
        &options,
        &["path", "content", "mode", "permissions"],
        &["content"],
    )?;
    if options.get("path").map(is_blank).unwrap_or(true) {
        options.insert(Value::from("path"), Value::from("LICENSE"));
    }
    let file = file_definition("license apply", options)?;
    if task.commit.is_empty() {
        task.commit.message_template = if template::contains_placeholder(&file.path_template) {
            "Add license".to_string()
        } else {
            format!("Add {}", file.path_template)
        };
    }
    task.files.push(file);
    task.validate()?;
    Ok(Operation::Tasks(TaskOperation { tasks: vec![task] }))
}

fn compile_prs_cleanup(step: &StepConfiguration) -> Result<Operation> {
    single_action(
        step,
        crate::actions::branches::ACTION_TYPE,
        &["remote", "limit"],
        &[],
        &[],
    )
}

fn compile_branch_refresh(step: &StepConfiguration) -> Result<Operation> {
    // `branch` belongs to the action here, not to the task.
    single_action(
        step,
        crate::actions::refresh::ACTION_TYPE,
        &["branch", "remote", "stash"],
        &["branch"],
        &["require_clean"],
    )
}

fn compile_packages_purge(step: &StepConfiguration) -> Result<Operation> {
    single_action(
        step,
        crate::actions::packages::ACTION_TYPE,
        &["package", "owner", "owner_type", "per_page"],
        &[],
        &[],
    )
}
