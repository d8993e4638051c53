//! # CLI Command Implementations
//!
//! One module per top-level subcommand. Each defines its `clap` arguments and
//! an `execute` function that builds a workflow [`Configuration`] (usually a
//! single step) and hands it to [`common::run_configuration`], so every
//! command goes through the same engine as `workflow run`.
//!
//! [`Configuration`]: repo_fleet::config::Configuration

pub mod branch;
pub mod common;
pub mod completions;
pub mod files;
pub mod folder;
pub mod history;
pub mod license;
pub mod namespace;
pub mod packages;
pub mod prs;
pub mod remote;
pub mod workflow;
