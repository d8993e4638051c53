//! `remote canonical` and `remote protocol`.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use repo_fleet::defaults::DEFAULT_REMOTE;
use repo_fleet::workflow::options::OptionMap;

use super::common::{insert, insert_optional, run_configuration, single_step, GlobalContext, RunArgs};

/// Rewrite remote URLs
#[derive(Args, Debug)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolArg {
    Https,
    Ssh,
    Git,
}

impl ProtocolArg {
    fn as_str(self) -> &'static str {
        match self {
            ProtocolArg::Https => "https",
            ProtocolArg::Ssh => "ssh",
            ProtocolArg::Git => "git",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommand {
    /// Point the remote at the canonical GitHub owner/name
    Canonical {
        /// Fail when the canonical owner is not this one.
        #[arg(long, value_name = "OWNER")]
        owner: Option<String>,

        #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
        remote: String,

        /// Skip repositories with uncommitted changes.
        #[arg(long)]
        require_clean: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Convert the remote URL from one protocol to another
    Protocol {
        #[arg(long, value_enum)]
        from: ProtocolArg,

        #[arg(long, value_enum)]
        to: ProtocolArg,

        #[arg(long, value_name = "NAME", default_value = DEFAULT_REMOTE)]
        remote: String,

        #[command(flatten)]
        run: RunArgs,
    },
}

pub fn execute(args: RemoteArgs, context: &GlobalContext) -> Result<()> {
    match args.command {
        RemoteCommand::Canonical {
            owner,
            remote,
            require_clean,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "remote", remote);
            insert_optional(&mut options, "owner", owner.as_deref());
            if require_clean {
                insert(&mut options, "require_clean", true);
            }
            let configuration = single_step(
                "canonical remotes",
                &["remote", "update-to-canonical"],
                options,
            );
            run_configuration(&configuration, &run, context)
        }
        RemoteCommand::Protocol {
            from,
            to,
            remote,
            run,
        } => {
            let mut options = OptionMap::new();
            insert(&mut options, "from", from.as_str());
            insert(&mut options, "to", to.as_str());
            insert(&mut options, "remote", remote);
            let configuration =
                single_step("remote protocol", &["remote", "update-protocol"], options);
            run_configuration(&configuration, &run, context)
        }
    }
}
