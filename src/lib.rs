//! # repo-fleet
//!
//! Apply bulk maintenance workflows across a fleet of local Git repositories:
//! canonical remotes, folder names, module path rewrites, history purges,
//! file seeding, branch cleanup and container package pruning.
//!
//! ## Quick Example
//!
//! ```
//! use repo_fleet::config;
//! use repo_fleet::workflow::compiler::{build_operations, Operation};
//!
//! let configuration = config::parse(
//!     r#"
//! workflow:
//!   - step:
//!       name: ssh remotes
//!       command: [remote, update-protocol]
//!       with: { from: https, to: ssh }
//! "#,
//! )
//! .unwrap();
//!
//! let nodes = build_operations(&configuration).unwrap();
//! assert_eq!(nodes[0].command_key, "remote update-protocol");
//! assert!(matches!(nodes[0].operation, Operation::ProtocolConversion(_)));
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the YAML workflow document, a list of steps
//!   each naming a command path and its options.
//! - **Compiler (`workflow::compiler`)**: maps each step's command path to an
//!   operation node through a fixed dispatch table.
//! - **Actions (`actions`)**: registry-dispatched units of repository change,
//!   looked up by type string such as `repo.folder.rename`.
//! - **Executor (`workflow::executor`)**: discovers repositories under the
//!   roots and runs every node on each of them, sequentially.
//! - **Collaborators (`git`, `repository`, `github`, `filesystem`,
//!   `discovery`)**: traits over git, the GitHub CLI and the filesystem, so
//!   the engine can run against fakes in tests.
//!
//! ## Execution Flow
//!
//! 1.  **Parse**: read the workflow YAML (or an embedded preset).
//! 2.  **Compile**: turn steps into operation nodes; reject unsupported
//!     commands and malformed options.
//! 3.  **Discover**: find Git repositories under each root and order them.
//! 4.  **Execute**: for each repository, load metadata once, then run every
//!     node in order behind its safeguards and confirmation prompts.
//! 5.  **Report**: per-repository `PLAN`/`SKIP`/`ERROR` lines and a summary.

pub mod actions;
pub mod config;
pub mod defaults;
pub mod discovery;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod github;
pub mod output;
pub mod path;
pub mod presets;
pub mod remote_url;
pub mod repository;
pub mod settings;
pub mod suggestions;
pub mod workflow;

#[cfg(test)]
mod path_proptest;
