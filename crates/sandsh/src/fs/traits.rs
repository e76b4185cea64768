//! Filesystem trait definitions.
//!
//! All [`FileSystem`] implementations enforce POSIX-like semantics:
//!
//! 1. A file and a directory cannot share a path.
//! 2. `write_file`/`append_file` fail with "is a directory" on a directory.
//! 3. `mkdir` fails with "already exists" unless `recursive` and the
//!    existing entry is a directory.
//! 4. Write operations require the parent directory to exist (except
//!    `mkdir` with `recursive`).
//! 5. Paths containing NUL bytes are rejected by every operation.

use async_trait::async_trait;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Standard filesystem errors, for consistent messages across backends.
pub mod fs_errors {
    use super::*;

    #[inline]
    pub fn is_a_directory() -> crate::Error {
        IoError::other("Is a directory").into()
    }

    #[inline]
    pub fn not_a_directory() -> crate::Error {
        IoError::other("Not a directory").into()
    }

    #[inline]
    pub fn already_exists(msg: &str) -> crate::Error {
        IoError::new(ErrorKind::AlreadyExists, msg.to_string()).into()
    }

    #[inline]
    pub fn not_found(msg: &str) -> crate::Error {
        IoError::new(ErrorKind::NotFound, msg.to_string()).into()
    }

    #[inline]
    pub fn no_such_file() -> crate::Error {
        IoError::new(ErrorKind::NotFound, "No such file or directory").into()
    }

    #[inline]
    pub fn parent_not_found() -> crate::Error {
        IoError::new(ErrorKind::NotFound, "No such file or directory").into()
    }

    #[inline]
    pub fn directory_not_empty() -> crate::Error {
        IoError::other("Directory not empty").into()
    }

    #[inline]
    pub fn symlink_loop() -> crate::Error {
        IoError::other("Too many levels of symbolic links").into()
    }
}

/// Async virtual filesystem trait.
///
/// Implementations must be `Send + Sync`; the interpreter shares one
/// instance across pipeline stages, subshells, and command substitutions.
/// Paths are absolute (the interpreter resolves them against the working
/// directory before calling in).
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's contents as bytes, following symlinks.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write contents to a file, creating or truncating it. The parent
    /// directory must exist.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Append contents to a file, creating it if necessary.
    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory; with `recursive`, create parents as needed.
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a file or directory; `recursive` is required to remove a
    /// non-empty directory.
    async fn remove(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Get metadata for a path, following symlinks.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Get metadata without following a final symlink.
    async fn lstat(&self, path: &Path) -> Result<Metadata>;

    /// List directory entries.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Whether the path exists (after following symlinks).
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Rename or move a file or directory.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Copy a file; with `recursive`, copy a directory tree.
    async fn copy(&self, from: &Path, to: &Path, recursive: bool) -> Result<()>;

    /// Create a symbolic link at `link` pointing to `target`.
    async fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Read a symlink's target.
    async fn read_link(&self, path: &Path) -> Result<PathBuf>;

    /// Canonicalize: resolve every symlink component. The result contains
    /// no symlinks and no `.`/`..` components.
    async fn realpath(&self, path: &Path) -> Result<PathBuf>;

    /// Change permission bits.
    async fn chmod(&self, path: &Path, mode: u32) -> Result<()>;

    /// Set the modification time.
    async fn set_times(&self, path: &Path, modified: SystemTime) -> Result<()>;
}

/// File or directory metadata, as returned by [`FileSystem::stat`].
#[derive(Debug, Clone)]
pub struct Metadata {
    pub file_type: FileType,
    pub size: u64,
    pub mode: u32,
    pub modified: SystemTime,
    pub created: SystemTime,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            mode: 0o644,
            modified: SystemTime::UNIX_EPOCH,
            created: SystemTime::UNIX_EPOCH,
        }
    }
}

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// An entry in a directory listing. `name` is the final component only.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_predicates() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
        assert!(FileType::Symlink.is_symlink());
    }

    #[test]
    fn fs_error_messages_match_posix_wording() {
        assert!(format!("{}", fs_errors::no_such_file()).contains("No such file"));
        assert!(format!("{}", fs_errors::is_a_directory()).contains("Is a directory"));
        assert!(format!("{}", fs_errors::not_a_directory()).contains("Not a directory"));
        assert!(format!("{}", fs_errors::directory_not_empty()).contains("not empty"));
    }
}
