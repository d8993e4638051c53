//! Runs one task against one repository.
//!
//! Order: safeguards, confirmation, branch, files, actions, commit, push.
//! During a dry run every mutating step is reported as a `PLAN` line
//! instead of being performed.

use crate::error::{Error, Result};
use crate::path::clean_relative_path;
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use crate::workflow::registry::ActionRegistry;
use crate::workflow::safeguards;
use crate::workflow::tasks::{FileMode, TaskDefinition, TaskFileDefinition};
use crate::workflow::template::{render, render_options, TemplateContext};
use log::debug;

/// How a task ended on a repository when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Applied,
    Skipped(String),
    Declined,
}

/// Applies the safeguard and confirmation gates shared by every operation.
/// Returns the result to record when the task must not proceed.
pub(crate) fn gate(
    environment: &mut Environment<'_>,
    repository: &RepositoryState,
    task_name: &str,
    safeguards: &crate::workflow::tasks::Safeguards,
    mutating: bool,
) -> Result<Option<TaskResult>> {
    match safeguards::evaluate(environment, repository, safeguards) {
        Ok(()) => {}
        Err(Error::Safeguard { reason }) => {
            debug!(
                "skipping '{}' for {}: {}",
                task_name,
                repository.path.display(),
                reason
            );
            return Ok(Some(TaskResult::Skipped(reason)));
        }
        Err(error) => return Err(error),
    }

    if mutating && !environment.dry_run() {
        let prompt = format!("Apply '{}' to {}?", task_name, repository.path.display());
        if !environment.confirm(&prompt)? {
            return Ok(Some(TaskResult::Declined));
        }
    }
    Ok(None)
}

pub fn run_task(
    registry: &ActionRegistry,
    environment: &mut Environment<'_>,
    repository: &mut RepositoryState,
    task: &TaskDefinition,
) -> Result<TaskResult> {
    if let Some(result) = gate(
        environment,
        repository,
        &task.name,
        &task.effective_safeguards(),
        task.is_mutating(),
    )? {
        return Ok(result);
    }

    let branch = prepare_branch(environment, repository, task)?;

    for file in &task.files {
        write_task_file(environment, repository, file)?;
    }

    for action in &task.actions {
        if environment.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let rendered = {
            let context = TemplateContext::new(repository, environment.variables());
            render_options(&action.options, &context)?
        };
        let options = ActionOptions::new(action.action_type.clone(), rendered);
        registry.dispatch(&action.action_type, environment, repository, &options)?;
    }

    let committed = commit_changes(environment, repository, task)?;

    if let (Some(remote), Some(branch)) = (&task.branch.push_remote, &branch) {
        if committed || environment.dry_run() {
            environment.run_git(
                &repository.path,
                &["push", "--set-upstream", remote.as_str(), branch.as_str()],
            )?;
        }
    }

    Ok(TaskResult::Applied)
}

/// Checks out (creating when needed) the task branch. Returns its name.
fn prepare_branch(
    environment: &Environment<'_>,
    repository: &mut RepositoryState,
    task: &TaskDefinition,
) -> Result<Option<String>> {
    if task.branch.name_template.is_empty() {
        return Ok(None);
    }

    let (name, start_point) = {
        let context = TemplateContext::new(repository, environment.variables());
        let name = render(&task.branch.name_template, &context)?;
        let start_point = if task.branch.start_point_template.is_empty() {
            None
        } else {
            Some(render(&task.branch.start_point_template, &context)?)
        };
        (name, start_point)
    };

    let path = repository.path.clone();
    let reference = format!("refs/heads/{name}");
    let exists = environment
        .run_git(&path, &["rev-parse", "--verify", "--quiet", reference.as_str()])
        .is_ok();

    if exists {
        environment.run_git(&path, &["checkout", name.as_str()])?;
    } else {
        let mut arguments = vec!["checkout", "-B", name.as_str()];
        if let Some(start_point) = start_point.as_deref() {
            arguments.push(start_point);
        }
        environment.run_git(&path, &arguments)?;
    }

    repository.current_branch = Some(name.clone());
    repository.set_fact("branch.checked_out", name.clone());
    Ok(Some(name))
}

/// Seeds one file into the repository, honouring its mode and permissions.
pub fn write_task_file(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    file: &TaskFileDefinition,
) -> Result<()> {
    let context = TemplateContext::new(repository, environment.variables());
    let relative = clean_relative_path(&render(&file.path_template, &context)?)?;
    let target = repository.path.join(&relative);
    let filesystem = environment.dependencies().filesystem.as_ref();

    if file.mode == FileMode::SkipIfExists && filesystem.exists(&target)? {
        debug!("{} already exists, leaving it alone", target.display());
        return Ok(());
    }

    let content = render(&file.content_template, &context)?;
    let permissions = file.permissions.unwrap_or_default();

    if environment.dry_run() {
        environment.plan(
            &repository.path,
            &format!("write {relative} ({permissions})"),
        );
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        filesystem.mkdir_all(parent)?;
    }
    filesystem.write_file(&target, content.as_bytes(), permissions.bits())
}

/// Stages everything and commits when the worktree has changes.
fn commit_changes(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    task: &TaskDefinition,
) -> Result<bool> {
    if task.commit.is_empty() {
        return Ok(false);
    }
    let message = {
        let context = TemplateContext::new(repository, environment.variables());
        render(&task.commit.message_template, &context)?
    };

    if environment.dry_run() {
        environment.plan(&repository.path, &format!("commit \"{message}\""));
        return Ok(false);
    }

    environment.run_git(&repository.path, &["add", "-A"])?;
    let status = environment
        .dependencies()
        .repositories
        .worktree_status(&repository.path)?;
    if status.is_empty() {
        debug!("nothing to commit in {}", repository.path.display());
        return Ok(false);
    }
    environment.run_git(&repository.path, &["commit", "-m", message.as_str()])?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::environment::RuntimeOptions;
    use crate::workflow::tasks::{FilePermissions, TaskActionDefinition};
    use crate::workflow::test_support::Harness;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn repository() -> RepositoryState {
        let mut state = RepositoryState::new(PathBuf::from("/src/widgets"));
        state.current_branch = Some("main".to_string());
        state
    }

    fn file(path: &str, content: &str) -> TaskFileDefinition {
        TaskFileDefinition {
            path_template: path.to_string(),
            content_template: content.to_string(),
            mode: FileMode::Overwrite,
            permissions: None,
        }
    }

    #[test]
    fn test_full_task_sequence() {
        let harness = Harness::new();
        harness.repositories.set_status("/src/widgets", &[" M LICENSE"]);
        let options = RuntimeOptions {
            assume_yes: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&options);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ActionRegistry::new();
        let sink = seen.clone();
        registry.register_fn("test.record", move |_env, repo, opts| {
            sink.borrow_mut()
                .push(format!("{}:{}", repo.name(), opts.string("label")?));
            Ok(())
        });

        let mut task = TaskDefinition::named("seed");
        task.branch.name_template = "seed/{{ .Repository.Name }}".to_string();
        task.branch.start_point_template = "main".to_string();
        task.branch.push_remote = Some("origin".to_string());
        task.files.push(file("LICENSE", "MIT for {{ .Repository.Name }}"));
        task.commit.message_template = "Seed {{ .Repository.Name }}".to_string();
        let mut action_options = crate::workflow::options::OptionMap::new();
        action_options.insert("label".into(), "{{ .Repository.CurrentBranch }}".into());
        task.actions
            .push(TaskActionDefinition::new("test.record", action_options));

        let mut state = repository();
        let result = run_task(&registry, &mut environment, &mut state, &task).unwrap();
        assert_eq!(result, TaskResult::Applied);

        assert_eq!(
            harness.filesystem.read_string("/src/widgets/LICENSE").unwrap(),
            "MIT for widgets"
        );
        assert_eq!(seen.borrow().as_slice(), ["widgets:seed/widgets"]);
        assert_eq!(
            harness.git.git_commands(),
            vec![
                "rev-parse --verify --quiet refs/heads/seed/widgets",
                "checkout -B seed/widgets main",
                "add -A",
                "commit -m Seed widgets",
                "push --set-upstream origin seed/widgets",
            ]
        );
    }

    #[test]
    fn test_existing_branch_is_checked_out() {
        let harness = Harness::new();
        harness.git.respond("git rev-parse --verify", "abc123");
        let options = RuntimeOptions {
            assume_yes: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&options);
        let mut task = TaskDefinition::named("branch only");
        task.branch.name_template = "existing".to_string();

        let mut state = repository();
        run_task(&ActionRegistry::new(), &mut environment, &mut state, &task).unwrap();
        assert_eq!(harness.git.git_commands()[1], "checkout existing");
        assert_eq!(state.current_branch.as_deref(), Some("existing"));
    }

    #[test]
    fn test_no_commit_when_worktree_clean() {
        let harness = Harness::new();
        let options = RuntimeOptions {
            assume_yes: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&options);
        let mut task = TaskDefinition::named("commit only");
        task.commit.message_template = "noop".to_string();

        let mut state = repository();
        run_task(&ActionRegistry::new(), &mut environment, &mut state, &task).unwrap();
        assert_eq!(harness.git.git_commands(), vec!["add -A"]);
    }

    #[test]
    fn test_skip_if_exists_and_permissions() {
        let harness = Harness::new();
        harness
            .filesystem
            .add_file_string("/src/widgets/keep.txt", "original");
        let options = RuntimeOptions {
            assume_yes: true,
            ..RuntimeOptions::default()
        };
        let environment = harness.environment(&options);
        let state = repository();

        let mut keep = file("keep.txt", "replacement");
        keep.mode = FileMode::SkipIfExists;
        write_task_file(&environment, &state, &keep).unwrap();
        assert_eq!(
            harness.filesystem.read_string("/src/widgets/keep.txt").unwrap(),
            "original"
        );

        let mut script = file("bin/run.sh", "#!/bin/sh");
        script.permissions = Some(FilePermissions::parse("0755").unwrap());
        write_task_file(&environment, &state, &script).unwrap();
        let written = harness.filesystem.get_file("/src/widgets/bin/run.sh").unwrap();
        assert_eq!(written.permissions, 0o755);
    }

    #[test]
    fn test_rendered_path_must_stay_inside_repository() {
        let harness = Harness::new();
        let options = RuntimeOptions {
            variables: [("dir".to_string(), "../escape".to_string())].into(),
            ..RuntimeOptions::default()
        };
        let environment = harness.environment(&options);
        let err = write_task_file(&environment, &repository(), &file("{{ .Environment.dir }}/x", ""))
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn test_declined_task_does_nothing() {
        let harness = Harness::new();
        harness.prompter.push_answers(&[crate::workflow::confirmation::ConfirmationResult::no()]);
        let options = RuntimeOptions::default();
        let mut environment = harness.environment(&options);
        let mut task = TaskDefinition::named("declined");
        task.files.push(file("a.txt", "a"));

        let mut state = repository();
        let result = run_task(&ActionRegistry::new(), &mut environment, &mut state, &task).unwrap();
        assert_eq!(result, TaskResult::Declined);
        assert!(harness.filesystem.is_empty());
        assert_eq!(harness.prompter.prompts().len(), 1);
    }

    #[test]
    fn test_dry_run_plans_without_writing() {
        let harness = Harness::new();
        let options = RuntimeOptions {
            dry_run: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&options);
        let mut task = TaskDefinition::named("dry");
        task.branch.name_template = "topic".to_string();
        task.files.push(file("a.txt", "a"));
        task.commit.message_template = "msg".to_string();

        let mut state = repository();
        run_task(&ActionRegistry::new(), &mut environment, &mut state, &task).unwrap();

        assert!(harness.filesystem.is_empty());
        assert!(harness.git.mutating_calls().is_empty());
        assert!(harness.prompter.prompts().is_empty());
        let output = harness.output.contents();
        assert!(output.contains("PLAN /src/widgets: git checkout -B topic"));
        assert!(output.contains("PLAN /src/widgets: write a.txt (0644)"));
        assert!(output.contains("PLAN /src/widgets: commit \"msg\""));
    }

    #[test]
    fn test_unknown_action_fails() {
        let harness = Harness::new();
        let options = RuntimeOptions {
            assume_yes: true,
            ..RuntimeOptions::default()
        };
        let mut environment = harness.environment(&options);
        let mut task = TaskDefinition::named("unknown");
        task.actions
            .push(TaskActionDefinition::new("nope", Default::default()));
        let err = run_task(&ActionRegistry::new(), &mut environment, &mut repository(), &task)
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown action type: nope");
    }
}
