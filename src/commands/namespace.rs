//! `namespace rewrite`: move module and import paths to a new prefix.

use anyhow::Result;
use clap::{Args, Subcommand};

use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, run_configuration, single_step, GlobalContext, RunArgs, TaskArgs};

/// Rewrite module and import path prefixes
#[derive(Args, Debug)]
pub struct NamespaceArgs {
    #[command(subcommand)]
    pub command: NamespaceCommand,
}

#[derive(Subcommand, Debug)]
pub enum NamespaceCommand {
    /// Replace the OLD prefix with NEW in tracked source files
    Rewrite {
        /// Current prefix, e.g. github.com/old-org/app.
        #[arg(long)]
        old: String,

        /// Replacement prefix.
        #[arg(long)]
        new: String,

        /// File suffix or exact file name to rewrite (repeatable; default .go and go.mod).
        #[arg(long = "extension", value_name = "EXT")]
        extensions: Vec<String>,

        #[command(flatten)]
        task: TaskArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: NamespaceArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        NamespaceCommand::Rewrite {
            old,
            new,
            extensions,
            task,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "old", old);
            insert(&mut options, "new", new);
            if !extensions.is_empty() {
                insert(&mut options, "extensions", extensions);
            }
            task.insert_into(&mut options);
            let configuration = single_step("namespace rewrite", &["namespace", "rewrite"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
