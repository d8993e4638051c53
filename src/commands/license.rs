//! `license apply`: seed a license file on a branch and commit it.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs, TaskArgs};
use super::files::ModeArg;

/// Add a license file to every repository
#[derive(Args, Debug)]
pub struct LicenseArgs {
    #[command(subcommand)]
    pub command: LicenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum LicenseCommand {
    /// Write the license text and commit it
    Apply {
        /// File holding the license text (templates allowed).
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Where to write it inside each repository.
        #[arg(long, default_value = "LICENSE")]
        path: String,

        #[arg(long, value_enum, default_value = "overwrite")]
        mode: ModeArg,

        #[command(flatten)]
        task: TaskArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: LicenseArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        LicenseCommand::Apply {
            file,
            path,
            mode,
            task,
            run,
        } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", file.display(), e))?;
            let mut options = OptionMap::new();
            insert(&mut options, "content", content);
            insert(&mut options, "path", path);
            insert(&mut options, "mode", mode.as_str());
            task.insert_into(&mut options);
            let configuration = single_step("license apply", &["license", "apply"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
