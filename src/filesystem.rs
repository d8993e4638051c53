//! Filesystem access for actions and the task runner.
//!
//! [`FileSystem`] is the seam; [`OsFileSystem`] talks to the host, and
//! [`MemoryFS`] keeps everything in a map so tests can observe writes and
//! renames without touching disk.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

/// What `stat` reports about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub len: u64,
    pub permissions: u32,
}

/// Trait for filesystem access - allows mocking in tests
pub trait FileSystem: Send + Sync {
    /// Metadata for `path`, or `None` when nothing exists there.
    fn stat(&self, path: &Path) -> Result<Option<FileInfo>>;

    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes `content`, replacing any existing file, and applies `permissions`.
    fn write_file(&self, path: &Path, content: &[u8], permissions: u32) -> Result<()>;

    fn mkdir_all(&self, path: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Absolute form of `path`.
    fn abs(&self, path: &Path) -> Result<PathBuf>;

    /// Convenience wrapper around [`FileSystem::stat`].
    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.stat(path)?.is_some())
    }
}

fn fs_error(operation: &str, path: &Path, error: impl std::fmt::Display) -> Error {
    Error::Filesystem {
        message: format!("{} {}: {}", operation, path.display(), error),
    }
}

/// The host filesystem, through `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> Result<Option<FileInfo>> {
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => Ok(Some(FileInfo {
                is_dir: metadata.is_dir(),
                len: metadata.len(),
                permissions: permission_bits(&metadata),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(fs_error("stat", path, e)),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| fs_error("read", path, e))
    }

    fn write_file(&self, path: &Path, content: &[u8], permissions: u32) -> Result<()> {
        std::fs::write(path, content).map_err(|e| fs_error("write", path, e))?;
        set_permissions(path, permissions)
    }

    fn mkdir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| fs_error("create directory", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(|e| Error::Filesystem {
            message: format!("rename {} to {}: {}", from.display(), to.display(), e),
        })
    }

    fn abs(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let cwd = std::env::current_dir().map_err(|e| fs_error("resolve", path, e))?;
        Ok(crate::path::lexical_absolute(path, &cwd))
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, permissions: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(permissions))
        .map_err(|e| fs_error("chmod", path, e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _permissions: u32) -> Result<()> {
    Ok(())
}

/// Represents a file with content and metadata
#[derive(Debug, Clone)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Unix permission bits
    pub permissions: u32,
    /// File modification time
    pub modified_time: SystemTime,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644,
            modified_time: SystemTime::now(),
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: HashMap<PathBuf, File>,
    directories: HashSet<PathBuf>,
}

impl MemoryTree {
    fn add_parents(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(directory) = current {
            if directory.as_os_str().is_empty() {
                break;
            }
            self.directories.insert(directory.to_path_buf());
            current = directory.parent();
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
            || self.files.keys().any(|file| file.starts_with(path) && file != path)
    }
}

/// In-memory filesystem. Interior mutability lets it sit behind the shared
/// `&dyn FileSystem` handed to actions.
#[derive(Debug, Default)]
pub struct MemoryFS {
    tree: Mutex<MemoryTree>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, MemoryTree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add or update a file, creating its parent directories.
    pub fn add_file<P: AsRef<Path>>(&self, path: P, file: File) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.tree();
        tree.add_parents(&path);
        tree.files.insert(path, file);
    }

    /// Add a file from string content
    pub fn add_file_string<P: AsRef<Path>>(&self, path: P, content: &str) {
        self.add_file(path, File::from_string(content));
    }

    /// Record an empty directory.
    pub fn add_directory<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.tree();
        tree.add_parents(&path);
        tree.directories.insert(path);
    }

    /// A copy of the file at `path`, if any.
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<File> {
        self.tree().files.get(path.as_ref()).cloned()
    }

    /// File content as UTF-8 text, if the file exists.
    pub fn read_string<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        self.get_file(path)
            .map(|file| String::from_utf8_lossy(&file.content).into_owned())
    }

    /// Check if a file or directory exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        let tree = self.tree();
        tree.files.contains_key(path.as_ref()) || tree.is_dir(path.as_ref())
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.tree().files.is_empty()
    }
}

impl FileSystem for MemoryFS {
    fn stat(&self, path: &Path) -> Result<Option<FileInfo>> {
        let tree = self.tree();
        if let Some(file) = tree.files.get(path) {
            return Ok(Some(FileInfo {
                is_dir: false,
                len: file.size() as u64,
                permissions: file.permissions,
            }));
        }
        if tree.is_dir(path) {
            return Ok(Some(FileInfo {
                is_dir: true,
                len: 0,
                permissions: 0o755,
            }));
        }
        Ok(None)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.get_file(path)
            .map(|file| file.content)
            .ok_or_else(|| fs_error("read", path, "file not found"))
    }

    fn write_file(&self, path: &Path, content: &[u8], permissions: u32) -> Result<()> {
        let mut tree = self.tree();
        if tree.is_dir(path) {
            return Err(fs_error("write", path, "is a directory"));
        }
        let mut file = File::new(content.to_vec());
        file.permissions = permissions;
        tree.add_parents(path);
        tree.files.insert(path.to_path_buf(), file);
        Ok(())
    }

    fn mkdir_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree();
        if tree.files.contains_key(path) {
            return Err(fs_error("create directory", path, "a file exists at this path"));
        }
        tree.add_parents(path);
        tree.directories.insert(path.to_path_buf());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut tree = self.tree();
        if tree.files.contains_key(to) || tree.is_dir(to) {
            return Err(fs_error("rename", to, "destination already exists"));
        }

        if let Some(file) = tree.files.remove(from) {
            tree.add_parents(to);
            tree.files.insert(to.to_path_buf(), file);
            return Ok(());
        }

        if !tree.is_dir(from) {
            return Err(fs_error("rename", from, "no such file or directory"));
        }

        // Move a whole directory subtree.
        let moved_files: Vec<PathBuf> = tree
            .files
            .keys()
            .filter(|path| path.starts_with(from))
            .cloned()
            .collect();
        for old in moved_files {
            if let (Some(file), Ok(suffix)) = (tree.files.remove(&old), old.strip_prefix(from)) {
                tree.files.insert(to.join(suffix), file);
            }
        }
        let moved_directories: Vec<PathBuf> = tree
            .directories
            .iter()
            .filter(|path| path.starts_with(from))
            .cloned()
            .collect();
        for old in moved_directories {
            tree.directories.remove(&old);
            if let Ok(suffix) = old.strip_prefix(from) {
                tree.directories.insert(to.join(suffix));
            }
        }
        tree.add_parents(to);
        tree.directories.insert(to.to_path_buf());
        Ok(())
    }

    fn abs(&self, path: &Path) -> Result<PathBuf> {
        Ok(crate::path::lexical_absolute(path, Path::new("/")))
    }
}
