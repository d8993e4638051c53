//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then pull in what it needs:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_git_repo("acme/app", "git@github.com:acme/app.git");
//!     fixture.command().args(["folder", "rename", "--dry-run"]).assert().success();
//! }
//! ```
//!
//! Library-level tests use [`fleet::Fleet`], which wires recording fakes for
//! every collaborator into one `Dependencies` value.

use assert_fs::prelude::*;
use std::path::Path;
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::workflows;
    pub use super::TestFixture;
}

/// Workflow documents used across tests.
#[allow(dead_code)]
pub mod workflows {
    /// Rewrites `origin` from SSH to HTTPS.
    pub const TO_HTTPS: &str = r#"
workflow:
  - step:
      name: https remotes
      command: [remote, update-protocol]
      with:
        from: ssh
        to: https
"#;

    /// One task that seeds a file and commits it.
    pub const SEED_FILE: &str = r#"
workflow:
  - step:
      name: seed
      command: [tasks, apply]
      with:
        tasks:
          - name: add codeowners
            files:
              - path: .github/CODEOWNERS
                content: "* @acme/platform"
            commit:
              message: "Add CODEOWNERS"
"#;

    /// A command key nothing dispatches.
    pub const UNSUPPORTED: &str = r#"
workflow:
  - step:
      name: typo
      command: [folder, renme]
"#;

    pub const INVALID_YAML: &str = "workflow: [step: {name: broken";
}

/// A temporary directory holding repositories and workflow files.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Writes a file relative to the fixture root.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Writes `workflow.yaml` at the fixture root.
    pub fn with_workflow(self, content: &str) -> Self {
        self.with_file("workflow.yaml", content)
    }

    /// Initializes a git repository at `path` with `origin` pointing at `remote`.
    pub fn with_git_repo(self, path: &str, remote: &str) -> Self {
        let directory = self.temp_dir.child(path);
        directory.create_dir_all().expect("Failed to create repository");
        git(directory.path(), &["init", "--quiet"]);
        git(directory.path(), &["remote", "add", "origin", remote]);
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workflow_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("workflow.yaml")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Remote URL of `origin` in the repository at `path`.
    pub fn origin_url(&self, path: &str) -> String {
        let output = Command::new("git")
            .args(["remote", "get-url", "origin"])
            .current_dir(self.temp_dir.child(path).path())
            .output()
            .expect("Failed to run git");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// A command running in the fixture directory with empty user settings.
    pub fn command(&self) -> assert_cmd::Command {
        let settings = self.temp_dir.child("settings.yaml");
        if !settings.path().exists() {
            settings.write_str("").expect("Failed to write settings");
        }
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-fleet");
        cmd.current_dir(self.path())
            .env("REPO_FLEET_SETTINGS", settings.path())
            .env_remove("REPO_FLEET_ROOTS")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn git(directory: &Path, arguments: &[&str]) {
    let status = Command::new("git")
        .args(arguments)
        .current_dir(directory)
        .status()
        .expect("Failed to run git");
    assert!(status.success(), "git {:?} failed", arguments);
}

/// Recording fakes for the engine's collaborator traits.
#[allow(dead_code)]
pub mod fleet {
    use repo_fleet::discovery::RepositoryDiscoverer;
    use repo_fleet::error::{Error, Result};
    use repo_fleet::filesystem::MemoryFS;
    use repo_fleet::git::{CommandDetails, ExecutionResult, GitExecutor};
    use repo_fleet::github::{
        GitHubMetadataResolver, OwnerKind, PackageVersion, PackageVersionClient,
        RepositoryMetadata,
    };
    use repo_fleet::repository::GitRepositoryManager;
    use repo_fleet::workflow::confirmation::{ConfirmationPrompter, ConfirmationResult};
    use repo_fleet::workflow::environment::{Dependencies, Reporter, SharedBuffer};
    use std::collections::{HashMap, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// `(program, directory, arguments)` of every subprocess call.
    #[derive(Default)]
    pub struct RecordingGit {
        calls: Mutex<Vec<(&'static str, Option<PathBuf>, CommandDetails)>>,
        failures: Mutex<Vec<String>>,
    }

    impl RecordingGit {
        /// Makes every call whose `program args` line starts with `prefix` fail.
        pub fn fail(&self, prefix: &str) {
            self.failures.lock().unwrap().push(prefix.to_string());
        }

        pub fn git_commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(program, _, _)| *program == "git")
                .map(|(_, _, details)| details.display())
                .collect()
        }

        /// Git commands issued in `directory`, in order.
        pub fn git_commands_in(&self, directory: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(program, path, _)| {
                    *program == "git" && path.as_deref() == Some(Path::new(directory))
                })
                .map(|(_, _, details)| details.display())
                .collect()
        }

        pub fn mutating_commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(program, _, details)| match *program {
                    "git" => details.is_mutating_git(),
                    _ => details.is_mutating_github_cli(),
                })
                .map(|(program, _, details)| format!("{} {}", program, details.display()))
                .collect()
        }

        fn record(&self, program: &'static str, details: &CommandDetails) -> Option<String> {
            self.calls.lock().unwrap().push((
                program,
                details.working_directory.clone(),
                details.clone(),
            ));
            let line = format!("{} {}", program, details.display());
            self.failures
                .lock()
                .unwrap()
                .iter()
                .find(|prefix| line.starts_with(prefix.as_str()))
                .map(|_| format!("fatal: {line} failed"))
        }
    }

    impl GitExecutor for RecordingGit {
        fn execute_git(&self, details: &CommandDetails) -> Result<ExecutionResult> {
            match self.record("git", details) {
                None => Ok(ExecutionResult::success("")),
                Some(stderr) => Err(Error::GitCommand {
                    command: details.display(),
                    path: details
                        .working_directory
                        .as_ref()
                        .map(|path| path.display().to_string())
                        .unwrap_or_default(),
                    stderr,
                }),
            }
        }

        fn execute_github_cli(&self, details: &CommandDetails) -> Result<ExecutionResult> {
            match self.record("gh", details) {
                None => Ok(ExecutionResult::success("[]")),
                Some(stderr) => Err(Error::GitHubCli {
                    command: details.display(),
                    stderr,
                }),
            }
        }
    }

    /// Repository facts by path: clean worktrees on `main` unless set.
    #[derive(Default)]
    pub struct FakeRepositories {
        dirty: Mutex<Vec<PathBuf>>,
        remotes: Mutex<HashMap<(PathBuf, String), String>>,
        set_calls: Mutex<Vec<(PathBuf, String, String)>>,
    }

    impl FakeRepositories {
        pub fn make_dirty(&self, path: &str) {
            self.dirty.lock().unwrap().push(PathBuf::from(path));
        }

        pub fn set_remote(&self, path: &str, remote: &str, url: &str) {
            self.remotes
                .lock()
                .unwrap()
                .insert((PathBuf::from(path), remote.to_string()), url.to_string());
        }

        pub fn set_calls(&self) -> Vec<(PathBuf, String, String)> {
            self.set_calls.lock().unwrap().clone()
        }
    }

    impl GitRepositoryManager for FakeRepositories {
        fn worktree_status(&self, path: &Path) -> Result<Vec<String>> {
            if self.dirty.lock().unwrap().iter().any(|dirty| dirty == path) {
                Ok(vec![" M README.md".to_string()])
            } else {
                Ok(Vec::new())
            }
        }

        fn current_branch(&self, _path: &Path) -> Result<String> {
            Ok("main".to_string())
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
            self.remotes
                .lock()
                .unwrap()
                .insert((path.to_path_buf(), remote.to_string()), url.to_string());
            Ok(())
        }
    }

    /// Resolves known slugs; anything else fails like `gh repo view` does.
    #[derive(Default)]
    pub struct FakeGitHub {
        known: Mutex<HashMap<String, RepositoryMetadata>>,
    }

    impl FakeGitHub {
        pub fn insert(&self, requested: &str, canonical: &str) {
            self.known.lock().unwrap().insert(
                requested.to_string(),
                RepositoryMetadata {
                    name_with_owner: canonical.to_string(),
                    default_branch: "main".to_string(),
                    is_archived: false,
                },
            );
        }
    }

    impl GitHubMetadataResolver for FakeGitHub {
        fn resolve_repo_metadata(&self, full_name: &str) -> Result<RepositoryMetadata> {
            self.known
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

    /// A registry with no package versions at all.
    pub struct NoPackages;

    impl PackageVersionClient for NoPackages {
        fn list_versions(
            &self,
            _owner: &str,
            _owner_kind: OwnerKind,
            _package: &str,
            _page: u64,
            _per_page: u64,
        ) -> Result<Vec<PackageVersion>> {
            Ok(Vec::new())
        }

        fn delete_version(
            &self,
            _owner: &str,
            _owner_kind: OwnerKind,
            _package: &str,
            version_id: u64,
        ) -> Result<()> {
            Err(Error::Action {
                action: "packages".to_string(),
                message: format!("no version {version_id}"),
            })
        }
    }

    /// Answers from a queue, then "no".
    #[derive(Default)]
    pub struct QueuedPrompter {
        answers: Mutex<VecDeque<ConfirmationResult>>,
        prompts: Mutex<Vec<String>>,
    }

    impl QueuedPrompter {
        pub fn answer(&self, answers: &[ConfirmationResult]) {
            self.answers.lock().unwrap().extend(answers.iter().copied());
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl ConfirmationPrompter for QueuedPrompter {
        fn confirm(&self, prompt: &str) -> Result<ConfirmationResult> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    /// Discovers a fixed list of repositories under any root.
    #[derive(Default)]
    pub struct FixedDiscoverer {
        repositories: Mutex<Vec<PathBuf>>,
        calls: Mutex<usize>,
    }

    impl FixedDiscoverer {
        pub fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl RepositoryDiscoverer for FixedDiscoverer {
        fn discover_repositories(&self, _roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.repositories.lock().unwrap().clone())
        }
    }

    /// Every fake wired into one `Dependencies`.
    pub struct Fleet {
        pub git: Arc<RecordingGit>,
        pub repositories: Arc<FakeRepositories>,
        pub github: Arc<FakeGitHub>,
        pub filesystem: Arc<MemoryFS>,
        pub prompter: Arc<QueuedPrompter>,
        pub discoverer: Arc<FixedDiscoverer>,
        pub output: SharedBuffer,
        pub errors: SharedBuffer,
        pub dependencies: Dependencies,
    }

    impl Fleet {
        /// A fleet of repositories at `paths`, discovered in that order.
        pub fn new(paths: &[&str]) -> Self {
            let git = Arc::new(RecordingGit::default());
            let repositories = Arc::new(FakeRepositories::default());
            let github = Arc::new(FakeGitHub::default());
            let filesystem = Arc::new(MemoryFS::new());
            let prompter = Arc::new(QueuedPrompter::default());
            let discoverer = Arc::new(FixedDiscoverer::default());
            *discoverer.repositories.lock().unwrap() = paths.iter().map(PathBuf::from).collect();
            let (reporter, output, errors) = Reporter::buffered();

            let dependencies = Dependencies {
                discoverer: discoverer.clone(),
                git: git.clone(),
                repositories: repositories.clone(),
                github: github.clone(),
                packages: Arc::new(NoPackages),
                filesystem: filesystem.clone(),
                prompter: prompter.clone(),
                reporter,
            };

            Self {
                git,
                repositories,
                github,
                filesystem,
                prompter,
                discoverer,
                output,
                errors,
                dependencies,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_workflow() {
        let fixture = TestFixture::new().with_workflow(workflows::TO_HTTPS);
        assert!(fixture.workflow_path().exists());
    }

    #[test]
    fn test_workflows_parse() {
        for document in [workflows::TO_HTTPS, workflows::SEED_FILE, workflows::UNSUPPORTED] {
            assert!(repo_fleet::config::parse(document).is_ok());
        }
        assert!(repo_fleet::config::parse(workflows::INVALID_YAML).is_err());
    }
}
