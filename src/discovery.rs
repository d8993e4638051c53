//! Finding git repositories under the configured roots.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Trait for repository discovery - allows mocking in tests
pub trait RepositoryDiscoverer: Send + Sync {
    /// Every repository found under `roots`, in walk order, without duplicates.
    fn discover_repositories(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>>;
}

/// Walks each root with `walkdir` and reports directories holding a `.git`
/// entry (a directory, or a gitfile for worktrees and submodules).
#[derive(Debug, Default, Clone, Copy)]
pub struct WalkdirDiscoverer;

fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

impl RepositoryDiscoverer for WalkdirDiscoverer {
    fn discover_repositories(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut repositories = Vec::new();

        for root in roots {
            if !root.is_dir() {
                return Err(Error::Discovery {
                    root: root.display().to_string(),
                    message: "root does not exist or is not a directory".to_string(),
                });
            }

            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.file_name() != ".git");

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("skipping unreadable entry under {}: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_dir() || !is_repository(entry.path()) {
                    continue;
                }
                let path = entry.into_path();
                if seen.insert(path.clone()) {
                    debug!("discovered repository {}", path.display());
                    repositories.push(path);
                }
            }
        }

        Ok(repositories)
    }
}
