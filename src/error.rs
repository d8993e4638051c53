//! # Error Handling
//!
//! This module defines the centralized error type for `repo-fleet`. It uses
//! `thiserror` to build a single `Error` enum covering every failure the
//! workflow engine and its collaborators can produce.
//!
//! ## Taxonomy
//!
//! The variants fall into five families:
//!
//! - **Configuration errors** (`ConfigParse`, `UnsupportedCommand`): malformed
//!   workflow YAML or a step whose command path is not in the dispatch table.
//! - **Validation errors** (`Validation`): a step, task, or action option has
//!   the wrong shape.
//! - **Safeguard violations** (`Safeguard`): a repository does not satisfy a
//!   task precondition. These never escape the executor; they become skips.
//! - **Collaborator errors** (`GitCommand`, `GitHubCli`, `Filesystem`,
//!   `Action`, `Template`, wrapped I/O): a subprocess, filesystem, or action
//!   failed for one repository.
//! - **Infrastructure errors** (`Discovery`, `UnknownAction`, `Cancelled`,
//!   `Prompt`): the run as a whole cannot continue.
//!
//! Whether an error aborts the run or only the current repository is decided
//! in exactly one place, [`Error::scope`].

use thiserror::Error;

/// Main error type for repo-fleet operations
#[derive(Error, Debug)]
pub enum Error {
    /// The workflow configuration could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A workflow step names a command path with no compiler entry.
    #[error("unsupported workflow command: {key}")]
    UnsupportedCommand { key: String },

    /// Step, task, or action options do not have the expected shape.
    #[error("invalid {context} options: {message}")]
    Validation { context: String, message: String },

    /// A task precondition was not met for a repository.
    #[error("safeguard not satisfied: {reason}")]
    Safeguard { reason: String },

    /// A git subprocess failed.
    #[error("git {command} failed in {path}: {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// A GitHub CLI subprocess failed.
    #[error("gh {command} failed: {stderr}")]
    GitHubCli { command: String, stderr: String },

    /// A filesystem collaborator call failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An action handler reported a failure.
    #[error("{action}: {message}")]
    Action { action: String, message: String },

    /// A task references an action type that has no registered handler.
    #[error("unknown action type: {action_type}")]
    UnknownAction { action_type: String },

    /// Repository discovery failed for a root.
    #[error("repository discovery failed for {root}: {message}")]
    Discovery { root: String, message: String },

    /// The run was cancelled before it could finish.
    #[error("execution cancelled")]
    Cancelled,

    /// The confirmation prompter could not obtain an answer.
    #[error("confirmation prompt failed: {message}")]
    Prompt { message: String },

    /// An error occurred during template rendering.
    ///
    /// May include the name of the problematic variable when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// How far an error reaches when it happens while processing a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Abort the entire run and return the error to the caller.
    Run,
    /// Abort the current repository's remaining work; the run continues.
    Repository,
}

impl Error {
    /// Classifies this error as run-fatal or repository-local.
    pub fn scope(&self) -> ErrorScope {
        match self {
            Error::ConfigParse { .. }
            | Error::UnsupportedCommand { .. }
            | Error::UnknownAction { .. }
            | Error::Discovery { .. }
            | Error::Cancelled
            | Error::Prompt { .. } => ErrorScope::Run,
            _ => ErrorScope::Repository,
        }
    }

    /// Shorthand for building a `Validation` error.
    pub fn validation(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Shorthand for building an `Action` error.
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Action {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
