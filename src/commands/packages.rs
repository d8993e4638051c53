//! `packages purge`: delete untagged container package versions.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, insert_optional, run_configuration, single_step, GlobalContext, RunArgs};

/// Prune container packages
#[derive(Args, Debug)]
pub struct PackagesArgs {
    #[command(subcommand)]
    pub command: PackagesCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OwnerTypeArg {
    Org,
    User,
}

#[derive(Subcommand, Debug)]
pub enum PackagesCommand {
    /// Delete every untagged version of each repository's container package
    Purge {
        /// Package name (defaults to the repository name).
        #[arg(long)]
        package: Option<String>,

        /// Package owner (defaults to the repository owner).
        #[arg(long)]
        owner: Option<String>,

        #[arg(long, value_enum, default_value = "org")]
        owner_type: OwnerTypeArg,

        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..=100))]
        per_page: u64,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: PackagesArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        PackagesCommand::Purge {
            package,
            owner,
            owner_type,
            per_page,
            run,
        } => {
            let mut options = OptionMap::new();
            insert_optional(&mut options, "package", package.as_deref());
            insert_optional(&mut options, "owner", owner.as_deref());
            let owner_type = match owner_type {
                OwnerTypeArg::Org => "org",
                OwnerTypeArg::User => "user",
            };
            insert(&mut options, "owner_type", owner_type);
            insert(&mut options, "per_page", per_page);
            let configuration = single_step("packages purge", &["packages", "purge"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
