//! `completions <shell>`: print a completion script for the whole command tree.
//!
//! ```bash
//! repo-fleet completions bash > ~/.local/share/bash-completion/completions/repo-fleet
//! repo-fleet completions zsh > ~/.zfunc/_repo-fleet
//! repo-fleet completions fish > ~/.config/fish/completions/repo-fleet.fish
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io::{self, Write};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(shell, &mut command, name, out);
}

pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_completions(args.shell, &mut io::stdout());
    Ok(())
}
