//! `files replace` and `files add`.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use repo_fleet::workflow::options::OptionMap;

use super::common::{
    insert, insert_optional, run_configuration, single_step, GlobalContext, RunArgs, TaskArgs,
};

/// Replace text in, or add, repository files
#[derive(Args, Debug)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub command: FilesCommand,
}

/// How an existing file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Overwrite,
    SkipIfExists,
}

impl ModeArg {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeArg::Overwrite => "overwrite",
            ModeArg::SkipIfExists => "skip-if-exists",
        }
    }
}

/// File content given inline or read from a file.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ContentArgs {
    /// Content (may use {{ .Repository.* }} and {{ .Environment.* }}).
    #[arg(long)]
    pub content: Option<String>,

    /// Read the content from this file.
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,
}

impl ContentArgs {
    pub fn read(&self) -> Result<String> {
        match (&self.content, &self.content_file) {
            (Some(content), _) => Ok(content.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e)),
            (None, None) => anyhow::bail!("either --content or --content-file is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// Replace literal text in tracked files
    Replace {
        #[arg(long)]
        find: String,

        #[arg(long, default_value = "")]
        replace: String,

        /// Glob selecting files (repeatable; default **/*).
        #[arg(long = "pattern", value_name = "GLOB")]
        patterns: Vec<String>,

        #[command(flatten)]
        task: TaskArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Write a file into every repository
    Add {
        /// Repository-relative path.
        #[arg(long)]
        path: String,

        #[command(flatten)]
        content: ContentArgs,

        #[arg(long, value_enum, default_value = "overwrite")]
        mode: ModeArg,

        /// Octal permissions, e.g. 0644.
        #[arg(long, value_name = "MODE")]
        permissions: Option<String>,

        #[command(flatten)]
        task: TaskArgs,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: FilesArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        FilesCommand::Replace {
            find,
            replace,
            patterns,
            task,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "find", find);
            insert(&mut options, "replace", replace);
            if !patterns.is_empty() {
                insert(&mut options, "patterns", patterns);
            }
            task.insert_into(&mut options);
            let configuration = single_step("files replace", &["files", "replace"], options);
            run_configuration(&configuration, &run, context)
        }
        FilesCommand::Add {
            path,
            content,
            mode,
            permissions,
            task,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "path", path);
            insert(&mut options, "content", content.read()?);
            insert(&mut options, "mode", mode.as_str());
            insert_optional(&mut options, "permissions", permissions.as_deref());
            task.insert_into(&mut options);
            let configuration = single_step("files add", &["files", "add"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
