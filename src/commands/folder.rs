//! `folder rename`: name each repository directory after its remote.

use anyhow::Result;
use clap::{Args, Subcommand};

use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs};

/// Rename repository folders after their remotes
#[derive(Args, Debug)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommand,
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Rename each repository folder to its remote repository name
    Rename {
        /// Place the folder under an owner directory (`<owner>/<name>`).
        #[arg(long)]
        include_owner: bool,

        /// Skip repositories with uncommitted changes.
        #[arg(long)]
        require_clean: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: FolderArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        FolderCommand::Rename {
            include_owner,
            require_clean,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "include_owner", include_owner);
            insert(&mut options, "require_clean", require_clean);
            let configuration = single_step("folder rename", &["folder", "rename"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
