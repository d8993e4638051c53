//! Subprocess execution for `git` and the GitHub CLI (`gh`).
//!
//! Everything the engine does to a repository goes through [`GitExecutor`],
//! which keeps subprocesses behind one seam that tests can replace with a
//! recording fake. The production implementation, [`ShellGitExecutor`], uses
//! the system binaries, so SSH keys, credential helpers and `gh auth` all
//! behave exactly as they do in the user's shell.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Arguments and environment for one subprocess invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDetails {
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: Vec<(String, String)>,
}

impl CommandDetails {
    pub fn new<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            arguments: arguments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Runs the command inside `directory`.
    pub fn in_directory(mut self, directory: &Path) -> Self {
        self.working_directory = Some(directory.to_path_buf());
        self
    }

    /// Adds an environment variable for the subprocess.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    /// Space-joined arguments, for messages.
    pub fn display(&self) -> String {
        self.arguments.join(" ")
    }

    fn has_argument(&self, candidates: &[&str]) -> bool {
        self.arguments
            .iter()
            .skip(1)
            .any(|argument| candidates.contains(&argument.as_str()))
    }

    /// Whether this git invocation changes repository, ref or remote state.
    pub fn is_mutating_git(&self) -> bool {
        let Some(verb) = self.arguments.first() else {
            return false;
        };
        match verb.as_str() {
            "push" | "commit" | "checkout" | "switch" | "add" | "stash" | "pull" | "fetch"
            | "reset" | "filter-repo" | "merge" | "rebase" | "tag" | "rm" | "mv" => true,
            "branch" => self.has_argument(&["-d", "-D", "--delete", "-m", "-M", "--move"]),
            "remote" => self.has_argument(&["set-url", "add", "remove", "rm", "rename"]),
            _ => false,
        }
    }

    /// Whether this `gh` invocation changes anything on GitHub.
    pub fn is_mutating_github_cli(&self) -> bool {
        let Some(verb) = self.arguments.first() else {
            return false;
        };
        match verb.as_str() {
            "api" => self
                .arguments
                .windows(2)
                .any(|pair| {
                    matches!(pair[0].as_str(), "-X" | "--method")
                        && !pair[1].eq_ignore_ascii_case("GET")
                }),
            "pr" => self.has_argument(&["close", "merge", "edit", "create"]),
            "repo" => self.has_argument(&["delete", "rename", "edit", "archive"]),
            _ => false,
        }
    }
}

/// Captured output of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    /// A successful result with the given stdout, mostly for fakes.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Non-empty, trimmed stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

/// Trait for subprocess execution - allows mocking in tests
pub trait GitExecutor: Send + Sync {
    /// Runs `git` with the given details. A non-zero exit is an error.
    fn execute_git(&self, details: &CommandDetails) -> Result<ExecutionResult>;

    /// Runs `gh` with the given details. A non-zero exit is an error.
    fn execute_github_cli(&self, details: &CommandDetails) -> Result<ExecutionResult>;
}

/// The default implementation of `GitExecutor`, which spawns the system
/// `git` and `gh` binaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellGitExecutor;

impl ShellGitExecutor {
    fn run(program: &str, details: &CommandDetails) -> std::result::Result<ExecutionResult, String> {
        let mut command = Command::new(program);
        command.args(&details.arguments);
        if let Some(directory) = &details.working_directory {
            command.current_dir(directory);
        }
        for (key, value) in &details.environment {
            command.env(key, value);
        }
        // Never block on an interactive credential prompt.
        command.env("GIT_TERMINAL_PROMPT", "0");

        debug!("running {} {}", program, details.display());
        let output = command.output().map_err(|e| e.to_string())?;

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if output.status.success() {
            Ok(result)
        } else {
            let stderr = result.stderr.trim();
            Err(if stderr.is_empty() {
                format!("exit code {}", result.exit_code)
            } else {
                stderr.to_string()
            })
        }
    }
}

impl GitExecutor for ShellGitExecutor {
    fn execute_git(&self, details: &CommandDetails) -> Result<ExecutionResult> {
        Self::run("git", details).map_err(|stderr| Error::GitCommand {
            command: details.display(),
            path: details
                .working_directory
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| ".".to_string()),
            stderr,
        })
    }

    fn execute_github_cli(&self, details: &CommandDetails) -> Result<ExecutionResult> {
        Self::run("gh", details).map_err(|stderr| Error::GitHubCli {
            command: details.display(),
            stderr,
        })
    }
}
