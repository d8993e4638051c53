//! # Executor
//!
//! Runs compiled operation nodes across the discovered repositories.
//!
//! ## Algorithm
//!
//! 1. Fail fast when any task references an unregistered action type.
//! 2. Discover repositories under the roots and drop nested ones unless
//!    asked to keep them.
//! 3. Order them: input order, or deepest first when requested (or when a
//!    node renames directories).
//! 4. For each repository, resolve metadata once, then run every node in
//!    declaration order.
//!
//! ## Failure policy
//!
//! [`Error::scope`] decides what an error aborts. Repository-scoped errors
//! stop the remaining tasks and nodes for that repository, get recorded in
//! the outcome and printed, and the run moves on. Run-scoped errors are
//! returned to the caller. Cancellation observed mid-run stops before the
//! next repository or action and returns the partial outcome.

use crate::actions::{folder, remote};
use crate::error::{Error, ErrorScope, Result};
use crate::path::{is_strict_descendant, path_depth};
use crate::remote_url::RemoteRepository;
use crate::workflow::compiler::{Operation, OperationNode};
use crate::workflow::environment::{
    CancellationFlag, Dependencies, Environment, RepositoryState, RuntimeOptions,
};
use crate::workflow::registry::ActionRegistry;
use crate::workflow::task_runner::{self, TaskResult};
use crate::workflow::tasks::Safeguards;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Final state of one task (or legacy operation) on one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Applied,
    Skipped { reason: String },
    Declined,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub node: String,
    pub task: String,
    pub status: TaskStatus,
}

/// Roll-up classification of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    Processed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOutcome {
    /// Path as discovered.
    pub path: PathBuf,
    /// Path after the run; differs when a folder rename moved it.
    pub final_path: PathBuf,
    pub records: Vec<TaskRecord>,
}

impl RepositoryOutcome {
    pub fn status(&self) -> RepositoryStatus {
        if self
            .records
            .iter()
            .any(|record| matches!(record.status, TaskStatus::Failed { .. }))
        {
            RepositoryStatus::Failed
        } else if self
            .records
            .iter()
            .any(|record| record.status == TaskStatus::Applied)
        {
            RepositoryStatus::Processed
        } else {
            RepositoryStatus::Skipped
        }
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub repositories: Vec<RepositoryOutcome>,
    /// The run stopped early because it was cancelled.
    pub cancelled: bool,
}

impl ExecutionOutcome {
    fn count(&self, status: RepositoryStatus) -> usize {
        self.repositories
            .iter()
            .filter(|repository| repository.status() == status)
            .count()
    }

    pub fn processed(&self) -> usize {
        self.count(RepositoryStatus::Processed)
    }

    pub fn skipped(&self) -> usize {
        self.count(RepositoryStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(RepositoryStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Drops repositories nested inside other discovered repositories, except
/// those that were given as roots themselves.
pub fn filter_nested(discovered: Vec<PathBuf>, roots: &[PathBuf]) -> Vec<PathBuf> {
    discovered
        .iter()
        .filter(|candidate| {
            roots.iter().any(|root| root == *candidate)
                || !discovered
                    .iter()
                    .any(|other| is_strict_descendant(candidate, other))
        })
        .cloned()
        .collect()
}

/// Sorts deepest paths first; equal depths keep their input order.
pub fn order_by_descending_depth(repositories: &mut [PathBuf]) {
    repositories.sort_by_key(|path| std::cmp::Reverse(path_depth(path)));
}

pub struct Executor<'a> {
    nodes: Vec<OperationNode>,
    registry: &'a ActionRegistry,
    dependencies: &'a Dependencies,
}

impl<'a> Executor<'a> {
    pub fn new(
        nodes: Vec<OperationNode>,
        registry: &'a ActionRegistry,
        dependencies: &'a Dependencies,
    ) -> Self {
        Self {
            nodes,
            registry,
            dependencies,
        }
    }

    pub fn execute(&self, roots: &[PathBuf], options: &RuntimeOptions) -> Result<ExecutionOutcome> {
        self.execute_with_cancellation(roots, options, CancellationFlag::new())
    }

    pub fn execute_with_cancellation(
        &self,
        roots: &[PathBuf],
        options: &RuntimeOptions,
        cancellation: CancellationFlag,
    ) -> Result<ExecutionOutcome> {
        if cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.check_action_types()?;

        let roots = self.absolute_roots(roots)?;
        let mut repositories = self.dependencies.discoverer.discover_repositories(&roots)?;
        if !options.include_nested_repositories {
            repositories = filter_nested(repositories, &roots);
        }
        let descending = options.process_repositories_by_descending_depth
            || self
                .nodes
                .iter()
                .any(|node| node.operation.requires_descending_depth());
        if descending {
            order_by_descending_depth(&mut repositories);
        }
        info!(
            "running {} step(s) across {} repositories",
            self.nodes.len(),
            repositories.len()
        );

        let mut environment = Environment::new(self.dependencies, options, cancellation);
        let mut outcome = ExecutionOutcome::default();

        for path in repositories {
            if environment.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let (repository, error) = self.process_repository(&mut environment, path);
            outcome.repositories.push(repository);
            match error {
                None => {}
                Some(Error::Cancelled) => {
                    outcome.cancelled = true;
                    break;
                }
                Some(error) => return Err(error),
            }
        }

        Ok(outcome)
    }

    fn check_action_types(&self) -> Result<()> {
        for node in &self.nodes {
            for action_type in node.operation.action_types() {
                if !self.registry.contains(action_type) {
                    return Err(Error::UnknownAction {
                        action_type: action_type.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn absolute_roots(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        roots
            .iter()
            .map(|root| self.dependencies.filesystem.abs(root))
            .collect()
    }

    /// Runs every node against one repository. A returned error is
    /// run-scoped; repository-scoped failures are already in the records.
    fn process_repository(
        &self,
        environment: &mut Environment<'_>,
        path: PathBuf,
    ) -> (RepositoryOutcome, Option<Error>) {
        let mut repository = RepositoryState::new(path.clone());
        if !environment.options().skip_repository_metadata {
            load_metadata(environment, &mut repository);
        }
        if environment.options().capture_initial_worktree_status {
            match environment
                .dependencies()
                .repositories
                .check_clean_worktree(&repository.path)
            {
                Ok(clean) => repository.initial_clean = Some(clean),
                Err(e) => warn!(
                    "could not capture worktree status for {}: {}",
                    repository.path.display(),
                    e
                ),
            }
        }

        let mut records = Vec::new();
        let mut run_error = None;
        for node in &self.nodes {
            if let Err(error) = self.run_node(environment, &mut repository, node, &mut records) {
                match error.scope() {
                    ErrorScope::Run => run_error = Some(error),
                    ErrorScope::Repository => environment.report_error(&format!(
                        "ERROR {}: {}",
                        repository.path.display(),
                        error
                    )),
                }
                break;
            }
        }

        (
            RepositoryOutcome {
                path,
                final_path: repository.path,
                records,
            },
            run_error,
        )
    }

    fn run_node(
        &self,
        environment: &mut Environment<'_>,
        repository: &mut RepositoryState,
        node: &OperationNode,
        records: &mut Vec<TaskRecord>,
    ) -> Result<()> {
        match &node.operation {
            Operation::Tasks(operation) => {
                for task in &operation.tasks {
                    let result =
                        task_runner::run_task(self.registry, environment, repository, task);
                    record(environment, repository, node, &task.name, result, records)?;
                }
                Ok(())
            }
            Operation::RenameFolders(rename) => {
                let safeguards = Safeguards {
                    require_clean: rename.require_clean,
                    ..Safeguards::default()
                };
                let result = folder::rename_pending(repository, rename.include_owner)
                    .and_then(|pending| {
                        task_runner::gate(environment, repository, &node.name, &safeguards, pending)
                    })
                    .and_then(|gated| match gated {
                        Some(result) => Ok(result),
                        None => folder::rename_repository(
                            environment,
                            repository,
                            rename.include_owner,
                        )
                        .map(|_| TaskResult::Applied),
                    });
                record(environment, repository, node, &node.name, result, records)
            }
            Operation::ProtocolConversion(conversion) => {
                let result = remote::protocol_conversion_pending(
                    environment,
                    repository,
                    &conversion.remote,
                    conversion.from,
                )
                .and_then(|pending| {
                    task_runner::gate(
                        environment,
                        repository,
                        &node.name,
                        &Safeguards::default(),
                        pending,
                    )
                })
                .and_then(|gated| match gated {
                    Some(result) => Ok(result),
                    None => remote::convert_protocol(
                        environment,
                        repository,
                        &conversion.remote,
                        conversion.from,
                        conversion.to,
                    )
                    .map(|_| TaskResult::Applied),
                });
                record(environment, repository, node, &node.name, result, records)
            }
        }
    }
}

/// Records a task result, reporting skips and declines. A safeguard raised
/// from inside an action counts as a skip. Other errors are recorded as
/// failures when repository-scoped and passed back either way.
fn record(
    environment: &Environment<'_>,
    repository: &RepositoryState,
    node: &OperationNode,
    task: &str,
    result: Result<TaskResult>,
    records: &mut Vec<TaskRecord>,
) -> Result<()> {
    let result = match result {
        Err(Error::Safeguard { reason }) => Ok(TaskResult::Skipped(reason)),
        other => other,
    };
    let status = match result {
        Ok(TaskResult::Applied) => TaskStatus::Applied,
        Ok(TaskResult::Skipped(reason)) => {
            environment.report(&format!(
                "SKIP {}: {}: {}",
                repository.path.display(),
                task,
                reason
            ));
            TaskStatus::Skipped { reason }
        }
        Ok(TaskResult::Declined) => {
            environment.report(&format!("DECLINED {}: {}", repository.path.display(), task));
            TaskStatus::Declined
        }
        Err(error) => {
            if error.scope() == ErrorScope::Repository {
                records.push(TaskRecord {
                    node: node.name.clone(),
                    task: task.to_string(),
                    status: TaskStatus::Failed {
                        error: error.to_string(),
                    },
                });
            }
            return Err(error);
        }
    };
    records.push(TaskRecord {
        node: node.name.clone(),
        task: task.to_string(),
        status,
    });
    Ok(())
}

/// Fills in branch, remote and GitHub metadata. Failures are logged and
/// leave the corresponding fields empty.
fn load_metadata(environment: &Environment<'_>, repository: &mut RepositoryState) {
    let dependencies = environment.dependencies();
    let path: &Path = &repository.path;

    match dependencies.repositories.current_branch(path) {
        Ok(branch) => repository.current_branch = Some(branch),
        Err(e) => debug!("no current branch for {}: {}", path.display(), e),
    }

    match dependencies.repositories.remote_url(path, "origin") {
        Ok(Some(url)) => {
            repository.remote = RemoteRepository::parse(&url).ok();
            repository.remote_url = Some(url);
        }
        Ok(None) => debug!("{} has no origin remote", path.display()),
        Err(e) => warn!("failed to read origin remote for {}: {}", path.display(), e),
    }

    if let Some(full_name) = repository.remote.as_ref().map(RemoteRepository::full_name) {
        match dependencies.github.resolve_repo_metadata(&full_name) {
            Ok(metadata) => repository.metadata = Some(metadata),
            Err(e) => warn!("failed to resolve metadata for {}: {}", full_name, e),
        }
    }
}
