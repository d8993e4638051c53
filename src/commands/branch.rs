//! `branch refresh`: fetch, check out and fast-forward a branch.

use anyhow::Result;
use clap::{Args, Subcommand};

use repo_fleet::defaults::DEFAULT_REMOTE;
use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs};

/// Refresh a branch from its remote
#[derive(Args, Debug)]
pub struct BranchArgs {
    #[command(subcommand)]
    pub command: BranchCommand,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommand {
    /// Fetch, check out and fast-forward BRANCH
    Refresh {
        /// Branch name; may be a template such as "{{ .Repository.DefaultBranch }}".
        #[arg(long)]
        branch: String,

        #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
        remote: String,

        /// Stash local changes first and restore them afterwards.
        #[arg(long)]
        stash: bool,

        /// Skip repositories with uncommitted changes.
        #[arg(long, conflicts_with = "stash")]
        require_clean: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: BranchArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        BranchCommand::Refresh {
            branch,
            remote,
            stash,
            require_clean,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "branch", branch);
            insert(&mut options, "remote", remote);
            insert(&mut options, "stash", stash);
            if require_clean {
                insert(&mut options, "require_clean", true);
            }
            let configuration = single_step("branch refresh", &["branch", "refresh"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
