//! GitHub lookups through the `gh` CLI.
//!
//! Two collaborators live here: a metadata resolver (canonical name, default
//! branch, archived flag) and a client for container package versions in
//! GHCR. Both shell out to `gh` via the shared [`GitExecutor`], so
//! authentication is whatever `gh auth status` says it is.

use crate::error::{Error, Result};
use crate::git::{CommandDetails, GitExecutor};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What GitHub reports about a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    /// Canonical `owner/name`, after any renames or transfers.
    pub name_with_owner: String,
    pub default_branch: String,
    pub is_archived: bool,
}

impl RepositoryMetadata {
    pub fn owner(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.name_with_owner)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoViewResponse {
    name_with_owner: String,
    #[serde(default)]
    default_branch_ref: Option<BranchRef>,
    #[serde(default)]
    is_archived: bool,
}

#[derive(Deserialize)]
struct BranchRef {
    name: String,
}

/// Parses the output of `gh repo view --json nameWithOwner,defaultBranchRef,isArchived`.
pub fn parse_repository_metadata(json: &str) -> Result<RepositoryMetadata> {
    let response: RepoViewResponse = serde_json::from_str(json)?;
    Ok(RepositoryMetadata {
        name_with_owner: response.name_with_owner,
        default_branch: response
            .default_branch_ref
            .map(|branch| branch.name)
            .unwrap_or_default(),
        is_archived: response.is_archived,
    })
}

/// Trait for metadata lookups - allows mocking in tests
pub trait GitHubMetadataResolver: Send + Sync {
    /// Resolves `owner/name` to its canonical metadata.
    fn resolve_repo_metadata(&self, full_name: &str) -> Result<RepositoryMetadata>;
}

/// Resolves metadata with `gh repo view`.
#[derive(Clone)]
pub struct GhCliMetadataResolver {
    git: Arc<dyn GitExecutor>,
}

impl GhCliMetadataResolver {
    pub fn new(git: Arc<dyn GitExecutor>) -> Self {
        Self { git }
    }
}

impl GitHubMetadataResolver for GhCliMetadataResolver {
    fn resolve_repo_metadata(&self, full_name: &str) -> Result<RepositoryMetadata> {
        let details = CommandDetails::new([
            "repo",
            "view",
            full_name,
            "--json",
            "nameWithOwner,defaultBranchRef,isArchived",
        ]);
        let result = self.git.execute_github_cli(&details)?;
        parse_repository_metadata(&result.stdout)
    }
}

/// A pull request as listed by `gh pr list --json headRefName,state,number`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestSummary {
    #[serde(default)]
    pub number: u64,
    pub head_ref_name: String,
    pub state: String,
}

pub fn parse_pull_requests(json: &str) -> Result<Vec<PullRequestSummary>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

/// Whether a package belongs to an organization or a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerKind {
    #[default]
    Org,
    User,
}

impl OwnerKind {
    fn api_prefix(self) -> &'static str {
        match self {
            OwnerKind::Org => "orgs",
            OwnerKind::User => "users",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OwnerKind::Org => "org",
            OwnerKind::User => "user",
        })
    }
}

impl FromStr for OwnerKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "org" | "organization" => Ok(OwnerKind::Org),
            "user" => Ok(OwnerKind::User),
            other => Err(Error::validation(
                "owner_type",
                format!("unsupported owner type '{other}' (expected org or user)"),
            )),
        }
    }
}

/// One version of a container package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub id: u64,
    pub tags: Vec<String>,
}

impl PackageVersion {
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

#[derive(Deserialize)]
struct VersionResponse {
    id: u64,
    #[serde(default)]
    metadata: Option<VersionMetadata>,
}

#[derive(Deserialize)]
struct VersionMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

pub fn parse_package_versions(json: &str) -> Result<Vec<PackageVersion>> {
    let versions: Vec<VersionResponse> = serde_json::from_str(json)?;
    Ok(versions
        .into_iter()
        .map(|version| PackageVersion {
            id: version.id,
            tags: version
                .metadata
                .and_then(|metadata| metadata.container)
                .map(|container| container.tags)
                .unwrap_or_default(),
        })
        .collect())
}

/// Trait for container registry access - allows mocking in tests
pub trait PackageVersionClient: Send + Sync {
    /// One page of versions, 1-based. An empty page means the listing is done.
    fn list_versions(
        &self,
        owner: &str,
        owner_kind: OwnerKind,
        package: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<PackageVersion>>;

    fn delete_version(
        &self,
        owner: &str,
        owner_kind: OwnerKind,
        package: &str,
        version_id: u64,
    ) -> Result<()>;
}

/// Talks to the GitHub packages REST API with `gh api`.
#[derive(Clone)]
pub struct GhApiPackageClient {
    git: Arc<dyn GitExecutor>,
}

impl GhApiPackageClient {
    pub fn new(git: Arc<dyn GitExecutor>) -> Self {
        Self { git }
    }
}

fn versions_endpoint(owner: &str, owner_kind: OwnerKind, package: &str) -> String {
    let package: String = url::form_urlencoded::byte_serialize(package.as_bytes()).collect();
    format!(
        "/{}/{}/packages/container/{}/versions",
        owner_kind.api_prefix(),
        owner,
        package
    )
}

impl PackageVersionClient for GhApiPackageClient {
    fn list_versions(
        &self,
        owner: &str,
        owner_kind: OwnerKind,
        package: &str,
        page: u64,
        per_page: u64,
    ) -> Result<Vec<PackageVersion>> {
        let endpoint = format!(
            "{}?page={}&per_page={}",
            versions_endpoint(owner, owner_kind, package),
            page,
            per_page
        );
        let result = self
            .git
            .execute_github_cli(&CommandDetails::new(["api".to_string(), endpoint]))?;
        parse_package_versions(&result.stdout)
    }

    fn delete_version(
        &self,
        owner: &str,
        owner_kind: OwnerKind,
        package: &str,
        version_id: u64,
    ) -> Result<()> {
        let endpoint = format!(
            "{}/{}",
            versions_endpoint(owner, owner_kind, package),
            version_id
        );
        self.git.execute_github_cli(&CommandDetails::new([
            "api".to_string(),
            "-X".to_string(),
            "DELETE".to_string(),
            endpoint,
        ]))?;
        Ok(())
    }
}
