//! Shared plumbing for the engine-backed commands: run flags, settings,
//! dependency wiring and the final summary.

use anyhow::{bail, Result};
use clap::Args;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repo_fleet::actions::builtin_registry;
use repo_fleet::config::{Configuration, StepConfiguration};
use repo_fleet::defaults::DEFAULT_ROOT;
use repo_fleet::filesystem::OsFileSystem;
use repo_fleet::output::{summary_line, OutputConfig};
use repo_fleet::settings::{self, Settings};
use repo_fleet::suggestions;
use repo_fleet::workflow;
use repo_fleet::workflow::confirmation::{
    ConfirmationPrompter, DeclineAllPrompter, TerminalPrompter,
};
use repo_fleet::workflow::environment::{Dependencies, Reporter, RuntimeOptions};
use repo_fleet::workflow::options::OptionMap;

/// Values of the global flags every command may need.
#[derive(Debug, Clone, Default)]
pub struct GlobalContext {
    pub color: String,
    pub settings: Option<PathBuf>,
}

/// Flags shared by every command that runs a workflow.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory to scan for repositories (repeatable). Defaults to the
    /// settings file roots, then the current directory.
    #[arg(long = "root", value_name = "PATH", env = "REPO_FLEET_ROOTS")]
    pub roots: Vec<PathBuf>,

    /// Print what would change without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Answer yes to every confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Also process repositories nested inside other repositories.
    #[arg(long)]
    pub include_nested: bool,

    /// Do not resolve remotes and GitHub metadata before running.
    #[arg(long)]
    pub skip_metadata: bool,

    /// Template variable available as {{ .Environment.KEY }} (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub variables: Vec<String>,
}

/// Task-level flags for commands that can work on a branch and commit.
#[derive(Args, Debug, Clone, Default)]
pub struct TaskArgs {
    /// Branch to create or check out before changing files.
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// Start point for a newly created branch.
    #[arg(long, value_name = "REF", requires = "branch")]
    pub start_point: Option<String>,

    /// Commit message for the changes.
    #[arg(long, value_name = "MESSAGE")]
    pub commit_message: Option<String>,

    /// Push the branch to this remote after committing.
    #[arg(long, value_name = "REMOTE", requires = "branch")]
    pub push_remote: Option<String>,

    /// Skip repositories with uncommitted changes.
    #[arg(long)]
    pub require_clean: bool,
}

impl TaskArgs {
    pub fn insert_into(&self, options: &mut OptionMap) {
        insert_optional(options, "branch", self.branch.as_deref());
        insert_optional(options, "start_point", self.start_point.as_deref());
        insert_optional(options, "commit_message", self.commit_message.as_deref());
        insert_optional(options, "push_remote", self.push_remote.as_deref());
        if self.require_clean {
            insert(options, "require_clean", true);
        }
    }
}

pub fn insert(options: &mut OptionMap, key: &str, value: impl Into<Value>) {
    options.insert(Value::from(key), value.into());
}

pub fn insert_optional(options: &mut OptionMap, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        insert(options, key, value);
    }
}

/// A one-step workflow.
pub fn single_step(name: &str, command: &[&str], options: OptionMap) -> Configuration {
    Configuration::new(vec![StepConfiguration::new(
        name,
        command.iter().copied(),
        options,
    )])
}

/// Splits `KEY=VALUE` arguments.
pub fn parse_variables(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|assignment| match assignment.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(suggestions::invalid_variable(assignment)),
        })
        .collect()
}

pub fn load_settings(context: &GlobalContext) -> Result<Settings> {
    let Some(location) = settings::locate_from_env(context.settings.as_deref()) else {
        return Ok(Settings::default());
    };
    if location.required && !location.path.exists() {
        return Err(suggestions::settings_not_found(&location.path));
    }
    settings::load(&OsFileSystem, &location).map_err(suggestions::explain)
}

/// `~/x` becomes `$HOME/x`; anything else is returned unchanged.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Flags first, then settings, then the current directory.
pub fn resolve_roots(args: &RunArgs, settings: &Settings) -> Vec<PathBuf> {
    let roots = if !args.roots.is_empty() {
        &args.roots
    } else {
        &settings.roots
    };
    if roots.is_empty() {
        return vec![PathBuf::from(DEFAULT_ROOT)];
    }
    roots.iter().map(|root| expand_home(root)).collect()
}

pub fn runtime_options(args: &RunArgs, settings: &Settings) -> Result<RuntimeOptions> {
    Ok(RuntimeOptions {
        dry_run: args.dry_run,
        assume_yes: args.yes || settings.assume_yes,
        capture_initial_worktree_status: true,
        include_nested_repositories: args.include_nested || settings.include_nested,
        process_repositories_by_descending_depth: false,
        skip_repository_metadata: args.skip_metadata,
        variables: settings.merged_variables(parse_variables(&args.variables)?),
    })
}

/// Prompts on a terminal; declines everything when stdin is not one.
fn prompter() -> Arc<dyn ConfirmationPrompter> {
    if console::Term::stderr().is_term() {
        Arc::new(TerminalPrompter)
    } else {
        Arc::new(DeclineAllPrompter)
    }
}

/// Runs `configuration` with the shared flags and prints the summary.
/// Fails when the run aborts, is cancelled, or any repository failed.
pub fn run_configuration(
    configuration: &Configuration,
    args: &RunArgs,
    context: &GlobalContext,
) -> Result<()> {
    let settings = load_settings(context)?;
    let options = runtime_options(args, &settings)?;
    let roots = resolve_roots(args, &settings);
    log::info!("roots: {:?}", roots);

    let registry = builtin_registry();
    let dependencies = Dependencies::system(prompter(), Reporter::stdio());
    let outcome = workflow::run(configuration, &registry, &dependencies, &roots, &options)
        .map_err(suggestions::explain)?;

    let out = OutputConfig::from_env_and_flag(&context.color);
    println!("{}", summary_line(&out, &outcome, options.dry_run));

    if outcome.has_failures() {
        bail!("{} repositories failed", outcome.failed());
    }
    if outcome.cancelled {
        bail!("run cancelled");
    }
    Ok(())
}
