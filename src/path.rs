//! Path manipulation utilities for repo-fleet

use crate::error::{Error, Result};
use glob::Pattern;
use std::path::{Component, Path, PathBuf};

/// Match a path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
    Ok(pattern.matches(path))
}

/// Match a path against any of several glob patterns
pub fn glob_match_any(patterns: &[String], path: &str) -> Result<bool> {
    for pattern in patterns {
        if glob_match(pattern, path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Clean a repository-relative path.
///
/// Removes `.` components and empty segments, and rejects absolute paths and
/// any path that climbs out of the repository with `..`. The returned path
/// uses `/` separators.
pub fn clean_relative_path(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Filesystem {
            message: "file path must not be empty".to_string(),
        });
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(Error::Filesystem {
            message: format!("file path must be relative: {trimmed}"),
        });
    }

    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::Filesystem {
                    message: format!("file path must stay inside the repository: {trimmed}"),
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Filesystem {
                    message: format!("file path must be relative: {trimmed}"),
                });
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::Filesystem {
            message: format!("file path does not name a file: {trimmed}"),
        });
    }

    Ok(parts.join("/"))
}

/// Number of normal components in a path; used to order repositories so that
/// children are processed before their parents.
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count()
}

/// Returns true when `candidate` lives strictly below `ancestor`.
pub fn is_strict_descendant(candidate: &Path, ancestor: &Path) -> bool {
    candidate != ancestor && candidate.starts_with(ancestor)
}

/// Convert a possibly relative path to a lexical absolute path without
/// touching the filesystem.
pub fn lexical_absolute(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.rs", "main.rs").unwrap());
        assert!(glob_match("**/*.go", "pkg/api/server.go").unwrap());
        assert!(!glob_match("*.rs", "main.go").unwrap());
    }

    #[test]
    fn test_glob_match_any() {
        let patterns = vec!["*.md".to_string(), "docs/**".to_string()];
        assert!(glob_match_any(&patterns, "README.md").unwrap());
        assert!(glob_match_any(&patterns, "docs/guide/intro.txt").unwrap());
        assert!(!glob_match_any(&patterns, "src/lib.rs").unwrap());
    }

    #[test]
    fn test_glob_match_invalid_pattern() {
        assert!(glob_match("[", "anything").is_err());
    }

    #[test]
    fn test_clean_relative_path_normalizes() {
        assert_eq!(clean_relative_path("LICENSE").unwrap(), "LICENSE");
        assert_eq!(clean_relative_path("./docs//guide.md").unwrap(), "docs/guide.md");
        assert_eq!(clean_relative_path(" .github/CODEOWNERS ").unwrap(), ".github/CODEOWNERS");
    }

    #[test]
    fn test_clean_relative_path_rejects_escapes() {
        assert!(clean_relative_path("/etc/passwd").is_err());
        assert!(clean_relative_path("../outside").is_err());
        assert!(clean_relative_path("docs/../../outside").is_err());
        assert!(clean_relative_path("").is_err());
        assert!(clean_relative_path(".").is_err());
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth(Path::new("/r")), 1);
        assert_eq!(path_depth(Path::new("/r/nested")), 2);
        assert_eq!(path_depth(Path::new("/")), 0);
    }

    #[test]
    fn test_is_strict_descendant() {
        assert!(is_strict_descendant(Path::new("/r/nested"), Path::new("/r")));
        assert!(!is_strict_descendant(Path::new("/r"), Path::new("/r")));
        assert!(!is_strict_descendant(Path::new("/rx"), Path::new("/r")));
    }

    #[test]
    fn test_lexical_absolute() {
        let base = Path::new("/home/dev");
        assert_eq!(lexical_absolute(Path::new("src/../repos"), base), PathBuf::from("/home/dev/repos"));
        assert_eq!(lexical_absolute(Path::new("/abs/./x"), base), PathBuf::from("/abs/x"));
    }
}
