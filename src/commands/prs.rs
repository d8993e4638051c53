//! `prs cleanup`: delete branches of closed pull requests.

use anyhow::Result;
use clap::{Args, Subcommand};

use repo_fleet::defaults::DEFAULT_REMOTE;
use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs};

/// Clean up after closed pull requests
#[derive(Args, Debug)]
pub struct PrsArgs {
    #[command(subcommand)]
    pub command: PrsCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrsCommand {
    /// Delete remote and local head branches of closed pull requests
    Cleanup {
        #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
        remote: String,

        /// How many closed pull requests to inspect.
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
        limit: u64,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: PrsArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        PrsCommand::Cleanup { remote, limit, run } => {
            let mut options = OptionMap::new();
            insert(&mut options, "remote", remote);
            insert(&mut options, "limit", limit);
            let configuration = single_step("prs cleanup", &["prs", "cleanup"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
