//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

/// repo-fleet - Apply bulk workflows across fleets of local Git repositories
#[derive(Parser, Debug)]
#[command(name = "repo-fleet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Settings file (defaults to $REPO_FLEET_SETTINGS, then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run, validate or list workflow files and presets
    Workflow(commands::workflow::WorkflowArgs),

    /// Rename repository folders after their remotes
    Folder(commands::folder::FolderArgs),

    /// Rewrite remote URLs
    Remote(commands::remote::RemoteArgs),

    /// Rewrite module and import path prefixes
    Namespace(commands::namespace::NamespaceArgs),

    /// Rewrite repository history
    History(commands::history::HistoryArgs),

    /// Replace text in, or add, repository files
    Files(commands::files::FilesArgs),

    /// Add a license file to every repository
    License(commands::license::LicenseArgs),

    /// Clean up after closed pull requests
    Prs(commands::prs::PrsArgs),

    /// Refresh a branch from its remote
    Branch(commands::branch::BranchArgs),

    /// Prune container packages
    Packages(commands::packages::PackagesArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let context = commands::common::GlobalContext {
            color: self.color,
            settings: self.settings,
        };

        match self.command {
            Commands::Workflow(args) => commands::workflow::execute(args, &context),
            Commands::Folder(args) => commands::folder::execute(args, &context),
            Commands::Remote(args) => commands::remote::execute(args, &context),
            Commands::Namespace(args) => commands::namespace::execute(args, &context),
            Commands::History(args) => commands::history::execute(args, &context),
            Commands::Files(args) => commands::files::execute(args, &context),
            Commands::License(args) => commands::license::execute(args, &context),
            Commands::Prs(args) => commands::prs::execute(args, &context),
            Commands::Branch(args) => commands::branch::execute(args, &context),
            Commands::Packages(args) => commands::packages::execute(args, &context),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    let environment = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(environment)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "repo-fleet",
            "folder",
            "rename",
            "--dry-run",
            "--log-level",
            "debug",
            "--color",
            "never",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.color, "never");
    }

    #[test]
    fn test_workflow_run_needs_file_or_preset() {
        assert!(Cli::try_parse_from(["repo-fleet", "workflow", "run"]).is_err());
        assert!(Cli::try_parse_from([
            "repo-fleet",
            "workflow",
            "run",
            "--file",
            "a.yaml",
            "--preset",
            "ssh-remotes"
        ])
        .is_err());
    }
}
