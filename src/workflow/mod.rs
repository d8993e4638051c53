//! # Workflow Engine
//!
//! Every fleet command ends up here. A [`Configuration`] is compiled into
//! operation nodes ([`compiler`]), and the [`executor`] runs those nodes
//! across discovered repositories, dispatching task actions through an
//! explicit [`registry::ActionRegistry`].
//!
//! ## Modules
//!
//! - [`options`]: untyped option trees and typed accessors
//! - [`tasks`]: task definitions and the `tasks apply` wire shape
//! - [`compiler`]: command key dispatch table and the `Operation` sum type
//! - [`registry`]: action type to handler table
//! - [`template`]: `{{ .Repository.* }}` / `{{ .Environment.* }}` rendering
//! - [`safeguards`]: per-repository preconditions
//! - [`confirmation`]: cascading yes / no / yes-to-all prompting
//! - [`environment`]: run options, collaborators, per-repository state
//! - [`task_runner`]: one task on one repository
//! - [`executor`]: discovery, ordering, failure policy, outcome

pub mod compiler;
pub mod confirmation;
pub mod environment;
pub mod executor;
pub mod options;
pub mod registry;
pub mod safeguards;
pub mod task_runner;
pub mod tasks;
pub mod template;

#[cfg(test)]
pub(crate) mod test_support;

use crate::config::Configuration;
use crate::error::Result;
use environment::{Dependencies, RuntimeOptions};
use executor::{ExecutionOutcome, Executor};
use registry::ActionRegistry;
use std::path::PathBuf;

/// Compiles `configuration` and runs it over the repositories under `roots`.
pub fn run(
    configuration: &Configuration,
    registry: &ActionRegistry,
    dependencies: &Dependencies,
    roots: &[PathBuf],
    options: &RuntimeOptions,
) -> Result<ExecutionOutcome> {
    let nodes = compiler::build_operations(configuration)?;
    Executor::new(nodes, registry, dependencies).execute(roots, options)
}
