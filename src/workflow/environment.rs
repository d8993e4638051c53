//! Run-wide and per-repository context handed to action handlers.

use crate::discovery::{RepositoryDiscoverer, WalkdirDiscoverer};
use crate::error::Result;
use crate::filesystem::{FileSystem, OsFileSystem};
use crate::git::{CommandDetails, ExecutionResult, GitExecutor, ShellGitExecutor};
use crate::github::{
    GhApiPackageClient, GhCliMetadataResolver, GitHubMetadataResolver, PackageVersionClient,
    RepositoryMetadata,
};
use crate::remote_url::RemoteRepository;
use crate::repository::{GitRepositoryManager, ShellRepositoryManager};
use crate::workflow::confirmation::{ConfirmationPrompter, ConfirmationState};
use log::warn;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Switches that shape one run. Fixed for the duration of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub dry_run: bool,
    pub assume_yes: bool,
    pub capture_initial_worktree_status: bool,
    pub include_nested_repositories: bool,
    pub process_repositories_by_descending_depth: bool,
    pub skip_repository_metadata: bool,
    /// Values for `{{ .Environment.<key> }}`.
    pub variables: BTreeMap<String, String>,
}

/// Writers for per-repository output and error lines.
pub struct Reporter {
    output: RefCell<Box<dyn Write>>,
    errors: RefCell<Box<dyn Write>>,
}

impl Reporter {
    pub fn new(output: Box<dyn Write>, errors: Box<dyn Write>) -> Self {
        Self {
            output: RefCell::new(output),
            errors: RefCell::new(errors),
        }
    }

    /// Stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    /// Reporter writing into two in-memory buffers.
    pub fn buffered() -> (Self, SharedBuffer, SharedBuffer) {
        let output = SharedBuffer::default();
        let errors = SharedBuffer::default();
        (
            Self::new(Box::new(output.clone()), Box::new(errors.clone())),
            output,
            errors,
        )
    }

    pub fn line(&self, message: &str) {
        if let Err(e) = writeln!(self.output.borrow_mut(), "{message}") {
            warn!("failed to write output: {}", e);
        }
    }

    pub fn error_line(&self, message: &str) {
        if let Err(e) = writeln!(self.errors.borrow_mut(), "{message}") {
            warn!("failed to write error output: {}", e);
        }
    }
}

/// Cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Collaborators for one command invocation.
pub struct Dependencies {
    pub discoverer: Arc<dyn RepositoryDiscoverer>,
    pub git: Arc<dyn GitExecutor>,
    pub repositories: Arc<dyn GitRepositoryManager>,
    pub github: Arc<dyn GitHubMetadataResolver>,
    pub packages: Arc<dyn PackageVersionClient>,
    pub filesystem: Arc<dyn FileSystem>,
    pub prompter: Arc<dyn ConfirmationPrompter>,
    pub reporter: Reporter,
}

impl Dependencies {
    /// Production wiring: system `git`/`gh`, host filesystem, `walkdir` discovery.
    pub fn system(prompter: Arc<dyn ConfirmationPrompter>, reporter: Reporter) -> Self {
        let git: Arc<dyn GitExecutor> = Arc::new(ShellGitExecutor);
        Self {
            discoverer: Arc::new(WalkdirDiscoverer),
            repositories: Arc::new(ShellRepositoryManager::new(git.clone())),
            github: Arc::new(GhCliMetadataResolver::new(git.clone())),
            packages: Arc::new(GhApiPackageClient::new(git.clone())),
            filesystem: Arc::new(OsFileSystem),
            git,
            prompter,
            reporter,
        }
    }
}

/// Cooperative cancellation, checked between repositories and between actions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What an action handler can reach while it runs.
pub struct Environment<'a> {
    dependencies: &'a Dependencies,
    options: &'a RuntimeOptions,
    confirmation: ConfirmationState,
    cancellation: CancellationFlag,
}

impl<'a> Environment<'a> {
    pub fn new(
        dependencies: &'a Dependencies,
        options: &'a RuntimeOptions,
        cancellation: CancellationFlag,
    ) -> Self {
        Self {
            dependencies,
            options,
            confirmation: ConfirmationState::new(options.assume_yes),
            cancellation,
        }
    }

    pub fn dependencies(&self) -> &'a Dependencies {
        self.dependencies
    }

    pub fn options(&self) -> &'a RuntimeOptions {
        self.options
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn variables(&self) -> &'a BTreeMap<String, String> {
        &self.options.variables
    }

    /// Whether prompts are currently being answered automatically.
    pub fn assume_yes(&self) -> bool {
        self.confirmation.assume_yes()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Asks before a change. Dry runs never prompt.
    pub fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.dry_run() {
            return Ok(true);
        }
        self.confirmation
            .confirm(self.dependencies.prompter.as_ref(), prompt)
    }

    pub fn report(&self, message: &str) {
        self.dependencies.reporter.line(message);
    }

    pub fn report_error(&self, message: &str) {
        self.dependencies.reporter.error_line(message);
    }

    /// Prints a `PLAN` line describing a change a dry run suppressed.
    pub fn plan(&self, repository: &Path, message: &str) {
        self.report(&format!("PLAN {}: {}", repository.display(), message));
    }

    /// Runs git in `path`. During a dry run, mutating commands are only
    /// planned and report an empty success.
    pub fn run_git(&self, path: &Path, arguments: &[&str]) -> Result<ExecutionResult> {
        let details = CommandDetails::new(arguments.iter().copied()).in_directory(path);
        if self.dry_run() && details.is_mutating_git() {
            self.plan(path, &format!("git {}", details.display()));
            return Ok(ExecutionResult::default());
        }
        self.dependencies.git.execute_git(&details)
    }

    /// Runs `gh` in `path`, with the same dry-run rule as [`Self::run_git`].
    pub fn run_gh(&self, path: &Path, arguments: &[&str]) -> Result<ExecutionResult> {
        let details = CommandDetails::new(arguments.iter().copied()).in_directory(path);
        if self.dry_run() && details.is_mutating_github_cli() {
            self.plan(path, &format!("gh {}", details.display()));
            return Ok(ExecutionResult::default());
        }
        self.dependencies.git.execute_github_cli(&details)
    }
}

/// What is known about the repository being processed.
///
/// Created when a repository starts and dropped after its last node. Actions
/// may update it (a folder rename moves `path`) and leave facts for later
/// actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    pub path: PathBuf,
    pub current_branch: Option<String>,
    pub remote_url: Option<String>,
    pub remote: Option<RemoteRepository>,
    pub metadata: Option<RepositoryMetadata>,
    /// Worktree cleanliness captured before the first node ran.
    pub initial_clean: Option<bool>,
    facts: BTreeMap<String, String>,
}

impl RepositoryState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            current_branch: None,
            remote_url: None,
            remote: None,
            metadata: None,
            initial_clean: None,
            facts: BTreeMap::new(),
        }
    }

    /// Repository name: canonical name, else remote name, else directory name.
    pub fn name(&self) -> String {
        if let Some(metadata) = &self.metadata {
            if !metadata.name().is_empty() {
                return metadata.name().to_string();
            }
        }
        if let Some(remote) = &self.remote {
            return remote.name.clone();
        }
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn owner(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.owner().to_string())
            .filter(|owner| !owner.is_empty())
            .or_else(|| self.remote.as_ref().map(|remote| remote.owner.clone()))
    }

    /// `owner/name` when an owner is known.
    pub fn full_name(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.name_with_owner.clone())
            .filter(|full_name| full_name.contains('/'))
            .or_else(|| self.remote.as_ref().map(RemoteRepository::full_name))
    }

    pub fn default_branch(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.default_branch.as_str())
            .filter(|branch| !branch.is_empty())
    }

    pub fn set_fact(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.facts.insert(key.into(), value.into());
    }

    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }
}
