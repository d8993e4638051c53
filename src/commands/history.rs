//! `history purge`: remove paths from every commit.

use anyhow::Result;
use clap::{Args, Subcommand};

use repo_fleet::defaults::DEFAULT_REMOTE;
use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs};

/// Rewrite repository history
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Purge paths from history with git filter-repo and force-push
    Purge {
        /// Path to remove (repeatable).
        #[arg(long = "path", value_name = "PATH", required = true)]
        paths: Vec<String>,

        #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
        remote: String,

        /// Rewrite locally only.
        #[arg(long)]
        no_push: bool,

        /// Skip repositories with uncommitted changes.
        #[arg(long)]
        require_clean: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: HistoryArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        HistoryCommand::Purge {
            paths,
            remote,
            no_push,
            require_clean,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "paths", paths);
            insert(&mut options, "remote", remote);
            insert(&mut options, "push", !no_push);
            if require_clean {
                insert(&mut options, "require_clean", true);
            }
            let configuration = single_step("history purge", &["history", "purge"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
