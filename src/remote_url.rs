//! GitHub remote URL parsing and formatting.
//!
//! Remotes appear in four shapes:
//!
//! - `https://github.com/owner/repo.git`
//! - `git@github.com:owner/repo.git` (scp-like SSH)
//! - `ssh://git@github.com/owner/repo.git`
//! - `git://github.com/owner/repo.git`
//!
//! [`RemoteRepository::to_url`] always produces the first, second or fourth
//! form, with a `.git` suffix.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Transport protocol of a remote URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Https,
    Ssh,
    Git,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Ssh => "ssh",
            Protocol::Git => "git",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "https" | "http" => Ok(Protocol::Https),
            "ssh" => Ok(Protocol::Ssh),
            "git" => Ok(Protocol::Git),
            other => Err(Error::validation(
                "protocol",
                format!("unsupported protocol '{other}' (expected https, ssh or git)"),
            )),
        }
    }
}

/// Owner and name of a hosted repository, plus the protocol it was reached by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub host: String,
    pub owner: String,
    pub name: String,
    pub protocol: Protocol,
}

impl RemoteRepository {
    /// Parses any of the supported remote URL shapes.
    pub fn parse(remote: &str) -> Result<Self> {
        let trimmed = remote.trim();
        let invalid = || Error::validation("remote", format!("unrecognized remote URL '{trimmed}'"));

        if !trimmed.contains("://") {
            // scp-like syntax: [user@]host:owner/repo
            let (user_host, path) = trimmed.split_once(':').ok_or_else(invalid)?;
            let host = user_host.rsplit('@').next().unwrap_or(user_host);
            return Self::from_parts(host, path, Protocol::Ssh).ok_or_else(invalid);
        }

        let url = Url::parse(trimmed)?;
        let protocol = match url.scheme() {
            "https" | "http" => Protocol::Https,
            "ssh" | "git+ssh" => Protocol::Ssh,
            "git" => Protocol::Git,
            _ => return Err(invalid()),
        };
        let host = url.host_str().ok_or_else(invalid)?;
        Self::from_parts(host, url.path(), protocol).ok_or_else(invalid)
    }

    fn from_parts(host: &str, path: &str, protocol: Protocol) -> Option<Self> {
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path.split_once('/')?;
        if host.is_empty() || owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            protocol,
        })
    }

    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// A copy pointing at another `owner/name`.
    pub fn with_full_name(&self, full_name: &str) -> Option<Self> {
        let (owner, name) = full_name.split_once('/')?;
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            ..self.clone()
        })
    }

    /// Formats the remote for `protocol`.
    pub fn to_url(&self, protocol: Protocol) -> String {
        match protocol {
            Protocol::Https => format!("https://{}/{}/{}.git", self.host, self.owner, self.name),
            Protocol::Ssh => format!("git@{}:{}/{}.git", self.host, self.owner, self.name),
            Protocol::Git => format!("git://{}/{}/{}.git", self.host, self.owner, self.name),
        }
    }
}
