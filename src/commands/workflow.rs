//! # Workflow Command Implementation
//!
//! `workflow run` executes a workflow file or an embedded preset,
//! `workflow validate` compiles a file without touching any repository, and
//! `workflow presets` lists what is embedded.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use repo_fleet::actions::builtin_registry;
use repo_fleet::config::{self, Configuration};
use repo_fleet::output::{emoji, OutputConfig};
use repo_fleet::presets;
use repo_fleet::suggestions;
use repo_fleet::workflow::compiler::build_operations;

use super::common::{run_configuration, GlobalContext, RunArgs};

/// Run, validate or list workflows
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// Run a workflow file or preset across the repositories under the roots
    Run {
        /// Workflow YAML file.
        #[arg(short, long, value_name = "FILE", required_unless_present = "preset", conflicts_with = "preset")]
        file: Option<PathBuf>,

        /// Embedded preset name (see `workflow presets`).
        #[arg(short, long, value_name = "NAME")]
        preset: Option<String>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Parse and compile a workflow file without running it
    Validate {
        /// Workflow YAML file.
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Print the normalised workflow document after the step summary.
        #[arg(long)]
        print: bool,
    },

    /// List the embedded presets
    Presets,
}

pub fn execute(args: WorkflowArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        WorkflowCommand::Run { file, preset, run } => {
            let configuration = match (file, preset) {
                (Some(file), _) => load_file(&file)?,
                (None, Some(name)) => load_preset(&name)?,
                (None, None) => anyhow::bail!("either --file or --preset is required"),
            };
            run_configuration(&configuration, &run, context)
        }
        WorkflowCommand::Validate { file, print } => validate(&file, print, context),
        WorkflowCommand::Presets => {
            for preset in presets::all() {
                println!("{:<24} {}", preset.name, preset.description);
            }
            Ok(())
        }
    }
}

fn load_file(path: &Path) -> Result<Configuration> {
    if !path.exists() {
        return Err(suggestions::workflow_file_not_found(path));
    }
    config::from_file(path).map_err(suggestions::explain)
}

fn load_preset(name: &str) -> Result<Configuration> {
    let preset = presets::get(name).ok_or_else(|| suggestions::unknown_preset(name))?;
    preset.configuration().map_err(suggestions::explain)
}

fn validate(path: &Path, print: bool, context: &GlobalContext) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(&context.color);
    let configuration = load_file(path)?;
    let nodes = build_operations(&configuration).map_err(suggestions::explain)?;

    let registry = builtin_registry();
    for node in &nodes {
        for action_type in node.operation.action_types() {
            if !registry.contains(action_type) {
                let known: Vec<&str> = registry.action_types().collect();
                return Err(suggestions::unknown_action(action_type, &known));
            }
        }
    }

    println!(
        "{} {}: {} step(s)",
        emoji(&out, "✅", "[OK]"),
        path.display(),
        nodes.len()
    );
    for node in &nodes {
        println!("   {} ({})", node.name, node.command_key);
    }
    if print {
        print!("{}", configuration.to_yaml().map_err(suggestions::explain)?);
    }
    Ok(())
}
