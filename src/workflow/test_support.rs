//! Recording fakes for unit tests of the engine and the built-in actions.

use crate::discovery::RepositoryDiscoverer;
use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;
use crate::git::{CommandDetails, ExecutionResult, GitExecutor};
use crate::github::{
    GitHubMetadataResolver, OwnerKind, PackageVersion, PackageVersionClient, RepositoryMetadata,
};
use crate::repository::GitRepositoryManager;
use crate::workflow::confirmation::{ConfirmationPrompter, ConfirmationResult};
use crate::workflow::environment::{
    CancellationFlag, Dependencies, Environment, Reporter, RuntimeOptions, SharedBuffer,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: &'static str,
    pub directory: Option<PathBuf>,
    pub arguments: Vec<String>,
}

impl RecordedCall {
    pub fn display(&self) -> String {
        self.arguments.join(" ")
    }

    pub fn is_mutating(&self) -> bool {
        let details = CommandDetails::new(self.arguments.clone());
        if self.program == "git" {
            details.is_mutating_git()
        } else {
            details.is_mutating_github_cli()
        }
    }
}

/// Answers `git`/`gh` invocations by prefix and records every call.
///
/// Prefixes include the program (`"git status"`, `"gh pr list"`). Later
/// registrations win. Unmatched calls succeed with empty output.
#[derive(Default)]
pub struct FakeGit {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<Vec<(String, std::result::Result<String, String>)>>,
}

impl FakeGit {
    pub fn respond(&self, prefix: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), Ok(stdout.to_string())));
    }

    pub fn fail(&self, prefix: &str, stderr: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), Err(stderr.to_string())));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of every git call, space-joined.
    pub fn git_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == "git")
            .map(|call| call.display())
            .collect()
    }

    pub fn gh_commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == "gh")
            .map(|call| call.display())
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(RecordedCall::is_mutating)
            .collect()
    }

    fn answer(&self, program: &'static str, details: &CommandDetails) -> std::result::Result<String, String> {
        self.calls.lock().unwrap().push(RecordedCall {
            program,
            directory: details.working_directory.clone(),
            arguments: details.arguments.clone(),
        });
        let line = format!("{} {}", program, details.display());
        self.responses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(String::new()))
    }
}

impl GitExecutor for FakeGit {
    fn execute_git(&self, details: &CommandDetails) -> Result<ExecutionResult> {
        self.answer("git", details)
            .map(ExecutionResult::success)
            .map_err(|stderr| Error::GitCommand {
                command: details.display(),
                path: details
                    .working_directory
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default(),
                stderr,
            })
    }

    fn execute_github_cli(&self, details: &CommandDetails) -> Result<ExecutionResult> {
        self.answer("gh", details)
            .map(ExecutionResult::success)
            .map_err(|stderr| Error::GitHubCli {
                command: details.display(),
                stderr,
            })
    }
}

/// In-memory repository facts. Worktrees are clean and on `main` unless
/// configured otherwise.
#[derive(Default)]
pub struct FakeRepositories {
    status: Mutex<HashMap<PathBuf, Vec<String>>>,
    branches: Mutex<HashMap<PathBuf, String>>,
    remotes: Mutex<HashMap<(PathBuf, String), String>>,
    set_calls: Mutex<Vec<(PathBuf, String, String)>>,
}

impl FakeRepositories {
    pub fn set_status(&self, path: impl Into<PathBuf>, lines: &[&str]) {
        self.status.lock().unwrap().insert(
            path.into(),
            lines.iter().map(|line| line.to_string()).collect(),
        );
    }

    pub fn set_branch(&self, path: impl Into<PathBuf>, branch: &str) {
        self.branches
            .lock()
            .unwrap()
            .insert(path.into(), branch.to_string());
    }

    pub fn set_remote(&self, path: impl Into<PathBuf>, remote: &str, url: &str) {
        self.remotes
            .lock()
            .unwrap()
            .insert((path.into(), remote.to_string()), url.to_string());
    }

    /// Every `set_remote_url` call as `(path, remote, url)`.
    pub fn set_calls(&self) -> Vec<(PathBuf, String, String)> {
        self.set_calls.lock().unwrap().clone()
    }
}

impl GitRepositoryManager for FakeRepositories {
    fn worktree_status(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self
            .status
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        Ok(self
            .branches
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| "main".to_string()))
    }

    fn remote_url(&self, path: &Path, remote: &str) -> Result<Option<String>> {
        Ok(self
            .remotes
            .lock()
            .unwrap()
            .get(&(path.to_path_buf(), remote.to_string()))
            .cloned())
    }

    fn set_remote_url(&self, path: &Path, remote: &str, url: &str) -> Result<()> {
        self.set_calls.lock().unwrap().push((
            path.to_path_buf(),
            remote.to_string(),
            url.to_string(),
        ));
        self.set_remote(path, remote, url);
        Ok(())
    }
}

/// Canonical metadata keyed by the slug it is requested under.
#[derive(Default)]
pub struct FakeGitHub {
    metadata: Mutex<HashMap<String, RepositoryMetadata>>,
}

impl FakeGitHub {
    pub fn insert(&self, requested: &str, canonical: &str, default_branch: &str) {
        self.metadata.lock().unwrap().insert(
            requested.to_string(),
            RepositoryMetadata {
                name_with_owner: canonical.to_string(),
                default_branch: default_branch.to_string(),
                is_archived: false,
            },
        );
    }
}

impl GitHubMetadataResolver for FakeGitHub {
    fn resolve_repo_metadata(&self, full_name: &str) -> Result<RepositoryMetadata> {
        self.metadata
            .lock()
            .unwrap()
            .get(full_name)
            .cloned()
            .ok_or_else(|| Error::GitHubCli {
                command: format!("repo view {full_name}"),
                stderr: "Could not resolve to a Repository".to_string(),
            })
    }
}

/// Serves fixed pages of package versions and records deletions.
#[derive(Default)]
pub struct FakePackages {
    pages: Mutex<Vec<Vec<PackageVersion>>>,
    failing: Mutex<Vec<u64>>,
    listed: Mutex<Vec<(String, OwnerKind, String, u64)>>,
    deleted: Mutex<Vec<u64>>,
}

impl FakePackages {
    pub fn add_page(&self, versions: &[(u64, &[&str])]) {
        self.pages.lock().unwrap().push(
            versions
                .iter()
                .map(|(id, tags)| PackageVersion {
                    id: *id,
                    tags: tags.iter().map(|tag| tag.to_string()).collect(),
                })
                .collect(),
        );
    }

    pub fn fail_delete(&self, id: u64) {
        self.failing.lock().unwrap().push(id);
    }

    pub fn listed(&self) -> Vec<(String, OwnerKind, String, u64)> {
        self.listed.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<u64> {
        self.deleted.lock().unwrap().clone()
    }
}

impl PackageVersionClient for FakePackages {
    fn list_versions(
        &self,
        owner: &str,
        owner_kind: OwnerKind,
        package: &str,
        page: u64,
        _per_page: u64,
    ) -> Result<Vec<PackageVersion>> {
        self.listed.lock().unwrap().push((
            owner.to_string(),
            owner_kind,
            package.to_string(),
            page,
        ));
        let index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(index)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_version(
        &self,
        _owner: &str,
        _owner_kind: OwnerKind,
        _package: &str,
        version_id: u64,
    ) -> Result<()> {
        if self.failing.lock().unwrap().contains(&version_id) {
            return Err(Error::GitHubCli {
                command: format!("api -X DELETE .../{version_id}"),
                stderr: "HTTP 403".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(version_id);
        Ok(())
    }
}

/// Answers prompts from a queue (defaulting to "no") and records them.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<ConfirmationResult>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn push_answers(&self, answers: &[ConfirmationResult]) {
        self.answers.borrow_mut().extend(answers.iter().copied());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl ConfirmationPrompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str) -> Result<ConfirmationResult> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or_default())
    }
}

/// Returns a fixed list of repositories for any roots.
#[derive(Default)]
pub struct StaticDiscoverer {
    repositories: Mutex<Vec<PathBuf>>,
}

impl StaticDiscoverer {
    pub fn set(&self, repositories: &[&str]) {
        *self.repositories.lock().unwrap() = repositories.iter().map(PathBuf::from).collect();
    }
}

impl RepositoryDiscoverer for StaticDiscoverer {
    fn discover_repositories(&self, _roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        Ok(self.repositories.lock().unwrap().clone())
    }
}

/// Every fake wired into one `Dependencies`.
pub struct Harness {
    pub git: Arc<FakeGit>,
    pub repositories: Arc<FakeRepositories>,
    pub github: Arc<FakeGitHub>,
    pub packages: Arc<FakePackages>,
    pub filesystem: Arc<MemoryFS>,
    pub prompter: Arc<ScriptedPrompter>,
    pub discoverer: Arc<StaticDiscoverer>,
    pub output: SharedBuffer,
    pub errors: SharedBuffer,
    pub dependencies: Dependencies,
}

impl Harness {
    pub fn new() -> Self {
        let git = Arc::new(FakeGit::default());
        // Branches do not exist unless a test says so.
        git.fail("git rev-parse --verify", "fatal: Needed a single revision");
        let repositories = Arc::new(FakeRepositories::default());
        let github = Arc::new(FakeGitHub::default());
        let packages = Arc::new(FakePackages::default());
        let filesystem = Arc::new(MemoryFS::new());
        let prompter = Arc::new(ScriptedPrompter::default());
        let discoverer = Arc::new(StaticDiscoverer::default());
        let (reporter, output, errors) = Reporter::buffered();

        let dependencies = Dependencies {
            discoverer: discoverer.clone(),
            git: git.clone(),
            repositories: repositories.clone(),
            github: github.clone(),
            packages: packages.clone(),
            filesystem: filesystem.clone(),
            prompter: prompter.clone(),
            reporter,
        };

        Self {
            git,
            repositories,
            github,
            packages,
            filesystem,
            prompter,
            discoverer,
            output,
            errors,
            dependencies,
        }
    }

    pub fn environment<'a>(&'a self, options: &'a RuntimeOptions) -> Environment<'a> {
        Environment::new(&self.dependencies, options, CancellationFlag::new())
    }
}
