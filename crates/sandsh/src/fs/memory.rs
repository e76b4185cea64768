//! In-memory filesystem implementation.
//!
//! [`MemFs`] stores the whole tree in a `RwLock<HashMap>` keyed by
//! normalized absolute path. It is binary-safe, thread-safe, and creates a
//! conventional skeleton (`/tmp`, `/home/user`, `/dev/null`) so scripts
//! have somewhere to land.
//!
//! # Lazy content
//!
//! A seeded file may carry a [`ContentProvider`] instead of bytes. The
//! provider runs on the first read and its result is cached; any write
//! replaces the entry with an owned buffer. This lets callers mount large
//! host-backed blobs without paying a preload cost.

// RwLock read()/write().unwrap() only panics on lock poisoning, which means
// a prior panic while holding the lock; corrupted state must not propagate.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use super::path::{normalize_path, validate_path};
use super::traits::{fs_errors, DirEntry, FileSystem, FileType, Metadata};
use crate::error::Result;

const MAX_SYMLINK_HOPS: usize = 40;

/// Async closure producing file bytes on first read.
pub type ContentProvider = Arc<
    dyn Fn() -> Pin<Box<dyn Future<Output = std::io::Result<Vec<u8>>> + Send>> + Send + Sync,
>;

#[derive(Clone)]
enum FileContent {
    Bytes(Vec<u8>),
    Lazy(ContentProvider),
}

impl std::fmt::Debug for FileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileContent::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            FileContent::Lazy(_) => write!(f, "Lazy(<provider>)"),
        }
    }
}

#[derive(Debug, Clone)]
enum FsEntry {
    File {
        content: FileContent,
        metadata: Metadata,
    },
    Directory {
        metadata: Metadata,
    },
    Symlink {
        target: PathBuf,
        metadata: Metadata,
    },
}

impl FsEntry {
    fn metadata(&self) -> &Metadata {
        match self {
            FsEntry::File { metadata, .. }
            | FsEntry::Directory { metadata }
            | FsEntry::Symlink { metadata, .. } => metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            FsEntry::File { metadata, .. }
            | FsEntry::Directory { metadata }
            | FsEntry::Symlink { metadata, .. } => metadata,
        }
    }
}

fn dir_metadata() -> Metadata {
    Metadata {
        file_type: FileType::Directory,
        size: 0,
        mode: 0o755,
        modified: SystemTime::UNIX_EPOCH,
        created: SystemTime::UNIX_EPOCH,
    }
}

fn file_metadata(size: u64, mode: u32) -> Metadata {
    Metadata {
        file_type: FileType::File,
        size,
        mode,
        modified: SystemTime::UNIX_EPOCH,
        created: SystemTime::UNIX_EPOCH,
    }
}

/// In-memory filesystem. The default backend for
/// [`Shell::new()`](crate::Shell::new).
pub struct MemFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFs {
    /// Create a filesystem with the default skeleton: `/`, `/tmp`, `/home`,
    /// `/home/user`, `/dev`, and the `/dev/null` discard device.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for dir in ["/", "/tmp", "/home", "/home/user", "/dev"] {
            entries.insert(PathBuf::from(dir), FsEntry::Directory {
                metadata: dir_metadata(),
            });
        }
        entries.insert(
            PathBuf::from("/dev/null"),
            FsEntry::File {
                content: FileContent::Bytes(Vec::new()),
                metadata: file_metadata(0, 0o666),
            },
        );
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Seed a file synchronously, creating parent directories. Used by the
    /// shell builder; runtime writes go through [`FileSystem::write_file`].
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>, mode: u32) {
        let path = normalize_path(path.as_ref());
        let content = content.as_ref().to_vec();
        let mut entries = self.entries.write().unwrap();
        Self::ensure_parents(&mut entries, &path);
        let size = content.len() as u64;
        entries.insert(
            path,
            FsEntry::File {
                content: FileContent::Bytes(content),
                metadata: file_metadata(size, mode),
            },
        );
    }

    /// Seed a lazily-provided file. `provider` runs on the first read and
    /// the result is cached.
    pub fn add_lazy_file(&self, path: impl AsRef<Path>, provider: ContentProvider, mode: u32) {
        let path = normalize_path(path.as_ref());
        let mut entries = self.entries.write().unwrap();
        Self::ensure_parents(&mut entries, &path);
        entries.insert(
            path,
            FsEntry::File {
                content: FileContent::Lazy(provider),
                metadata: file_metadata(0, mode),
            },
        );
    }

    fn ensure_parents(entries: &mut HashMap<PathBuf, FsEntry>, path: &Path) {
        if let Some(parent) = path.parent() {
            let mut current = PathBuf::from("/");
            for component in parent.components().skip(1) {
                current.push(component);
                entries.entry(current.clone()).or_insert(FsEntry::Directory {
                    metadata: dir_metadata(),
                });
            }
        }
    }

    /// Resolve symlinks in every component of `path`. With `follow_final`
    /// false, a symlink in the last component is left unresolved.
    fn canonicalize_locked(
        entries: &HashMap<PathBuf, FsEntry>,
        path: &Path,
        follow_final: bool,
    ) -> Result<PathBuf> {
        let mut hops = 0usize;
        let mut current = normalize_path(path);
        'restart: loop {
            let components: Vec<_> = current
                .components()
                .skip(1)
                .map(|c| c.as_os_str().to_os_string())
                .collect();
            let mut resolved = PathBuf::from("/");
            for (i, comp) in components.iter().enumerate() {
                resolved.push(comp);
                let is_final = i + 1 == components.len();
                if is_final && !follow_final {
                    break;
                }
                if let Some(FsEntry::Symlink { target, .. }) = entries.get(&resolved) {
                    hops += 1;
                    if hops > MAX_SYMLINK_HOPS {
                        return Err(fs_errors::symlink_loop());
                    }
                    let base = resolved.parent().unwrap_or(Path::new("/")).to_path_buf();
                    let mut next = if target.is_absolute() {
                        target.clone()
                    } else {
                        base.join(target)
                    };
                    for rest in &components[i + 1..] {
                        next.push(rest);
                    }
                    current = normalize_path(&next);
                    continue 'restart;
                }
            }
            return Ok(resolved);
        }
    }

    fn resolve(&self, path: &Path, follow_final: bool) -> Result<PathBuf> {
        validate_path(path)?;
        let entries = self.entries.read().unwrap();
        Self::canonicalize_locked(&entries, path, follow_final)
    }
}

#[async_trait]
impl FileSystem for MemFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.resolve(path, true)?;
        let provider = {
            let entries = self.entries.read().unwrap();
            match entries.get(&path) {
                Some(FsEntry::File { content, .. }) => match content {
                    FileContent::Bytes(bytes) => return Ok(bytes.clone()),
                    FileContent::Lazy(provider) => Arc::clone(provider),
                },
                Some(FsEntry::Directory { .. }) => return Err(fs_errors::is_a_directory()),
                Some(FsEntry::Symlink { .. }) | None => return Err(fs_errors::no_such_file()),
            }
        };

        // Materialize outside the lock; cache unless a write raced us.
        let bytes = provider().await?;
        let mut entries = self.entries.write().unwrap();
        if let Some(FsEntry::File { content, metadata }) = entries.get_mut(&path) {
            if matches!(content, FileContent::Lazy(_)) {
                metadata.size = bytes.len() as u64;
                *content = FileContent::Bytes(bytes.clone());
            }
        }
        Ok(bytes)
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = self.resolve(path, true)?;
        if path == Path::new("/dev/null") {
            return Ok(());
        }
        let mut entries = self.entries.write().unwrap();
        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => return Err(fs_errors::is_a_directory()),
            Some(FsEntry::File { metadata, .. }) if metadata.mode & 0o200 == 0 => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "Permission denied",
                )
                .into());
            }
            _ => {}
        }
        match path.parent() {
            Some(parent) if parent != Path::new("/") => {
                match entries.get(parent) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(_) => return Err(fs_errors::not_a_directory()),
                    None => return Err(fs_errors::parent_not_found()),
                }
            }
            _ => {}
        }
        let mode = entries
            .get(&path)
            .map(|e| e.metadata().mode)
            .unwrap_or(0o644);
        entries.insert(
            path,
            FsEntry::File {
                content: FileContent::Bytes(content.to_vec()),
                metadata: file_metadata(content.len() as u64, mode),
            },
        );
        Ok(())
    }

    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let resolved = self.resolve(path, true)?;
        if resolved == Path::new("/dev/null") {
            return Ok(());
        }
        // Lazy entries must materialize before appending.
        let needs_read = {
            let entries = self.entries.read().unwrap();
            matches!(
                entries.get(&resolved),
                Some(FsEntry::File {
                    content: FileContent::Lazy(_),
                    ..
                })
            )
        };
        if needs_read {
            let existing = self.read_file(&resolved).await?;
            let mut combined = existing;
            combined.extend_from_slice(content);
            return self.write_file(&resolved, &combined).await;
        }

        let needs_write = {
            let mut entries = self.entries.write().unwrap();
            match entries.get_mut(&resolved) {
                Some(FsEntry::File {
                    content: FileContent::Bytes(existing),
                    metadata,
                }) => {
                    existing.extend_from_slice(content);
                    metadata.size = existing.len() as u64;
                    false
                }
                Some(FsEntry::Directory { .. }) => return Err(fs_errors::is_a_directory()),
                _ => true,
            }
        };
        if needs_write {
            self.write_file(&resolved, content).await
        } else {
            Ok(())
        }
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = self.resolve(path, true)?;
        let mut entries = self.entries.write().unwrap();
        if recursive {
            let mut current = PathBuf::from("/");
            for component in path.components().skip(1) {
                current.push(component);
                match entries.get(&current) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(_) => return Err(fs_errors::not_a_directory()),
                    None => {
                        entries.insert(current.clone(), FsEntry::Directory {
                            metadata: dir_metadata(),
                        });
                    }
                }
            }
            return Ok(());
        }
        if entries.contains_key(&path) {
            return Err(fs_errors::already_exists("File exists"));
        }
        match path.parent() {
            Some(parent) => match entries.get(parent) {
                Some(FsEntry::Directory { .. }) => {}
                Some(_) => return Err(fs_errors::not_a_directory()),
                None => return Err(fs_errors::parent_not_found()),
            },
            None => {}
        }
        entries.insert(path, FsEntry::Directory {
            metadata: dir_metadata(),
        });
        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = self.resolve(path, false)?;
        let mut entries = self.entries.write().unwrap();
        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                if recursive {
                    let doomed: Vec<PathBuf> = entries
                        .keys()
                        .filter(|p| p.starts_with(&path))
                        .cloned()
                        .collect();
                    for p in doomed {
                        entries.remove(&p);
                    }
                } else {
                    let has_children = entries
                        .keys()
                        .any(|p| p != &path && p.parent() == Some(path.as_path()));
                    if has_children {
                        return Err(fs_errors::directory_not_empty());
                    }
                    entries.remove(&path);
                }
                Ok(())
            }
            Some(FsEntry::File { .. }) | Some(FsEntry::Symlink { .. }) => {
                entries.remove(&path);
                Ok(())
            }
            None => Err(fs_errors::no_such_file()),
        }
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let path = self.resolve(path, true)?;
        let entries = self.entries.read().unwrap();
        entries
            .get(&path)
            .map(|e| e.metadata().clone())
            .ok_or_else(fs_errors::no_such_file)
    }

    async fn lstat(&self, path: &Path) -> Result<Metadata> {
        let path = self.resolve(path, false)?;
        let entries = self.entries.read().unwrap();
        entries
            .get(&path)
            .map(|e| e.metadata().clone())
            .ok_or_else(fs_errors::no_such_file)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.resolve(path, true)?;
        let entries = self.entries.read().unwrap();
        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                let mut result: Vec<DirEntry> = entries
                    .iter()
                    .filter(|(p, _)| p.parent() == Some(path.as_path()) && *p != &path)
                    .map(|(p, e)| DirEntry {
                        name: p
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                        metadata: e.metadata().clone(),
                    })
                    .collect();
                result.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(result)
            }
            Some(_) => Err(fs_errors::not_a_directory()),
            None => Err(fs_errors::no_such_file()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = match self.resolve(path, true) {
            Ok(p) => p,
            Err(_) => return Ok(false),
        };
        let entries = self.entries.read().unwrap();
        Ok(entries.contains_key(&path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.resolve(from, false)?;
        let to = self.resolve(to, true)?;
        let mut entries = self.entries.write().unwrap();
        if !entries.contains_key(&from) {
            return Err(fs_errors::no_such_file());
        }
        // Re-key the whole subtree so directory moves carry their children.
        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|p| p.starts_with(&from))
            .cloned()
            .collect();
        for old in moved {
            let entry = entries.remove(&old).unwrap();
            let suffix = old.strip_prefix(&from).unwrap().to_path_buf();
            let new = if suffix.as_os_str().is_empty() {
                to.clone()
            } else {
                to.join(suffix)
            };
            entries.insert(new, entry);
        }
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path, recursive: bool) -> Result<()> {
        let from = self.resolve(from, true)?;
        let to = self.resolve(to, true)?;
        let is_dir = {
            let entries = self.entries.read().unwrap();
            match entries.get(&from) {
                Some(FsEntry::Directory { .. }) => true,
                Some(_) => false,
                None => return Err(fs_errors::no_such_file()),
            }
        };
        if is_dir && !recursive {
            return Err(fs_errors::is_a_directory());
        }
        if !is_dir {
            // Route through read_file so lazy sources materialize.
            let bytes = self.read_file(&from).await?;
            return self.write_file(&to, &bytes).await;
        }
        let sources: Vec<PathBuf> = {
            let entries = self.entries.read().unwrap();
            entries
                .keys()
                .filter(|p| p.starts_with(&from))
                .cloned()
                .collect()
        };
        for src in sources {
            let suffix = src.strip_prefix(&from).unwrap().to_path_buf();
            let dst = if suffix.as_os_str().is_empty() {
                to.clone()
            } else {
                to.join(suffix)
            };
            let entry = {
                let entries = self.entries.read().unwrap();
                entries.get(&src).cloned()
            };
            match entry {
                Some(FsEntry::Directory { .. }) => {
                    let mut entries = self.entries.write().unwrap();
                    entries.entry(dst).or_insert(FsEntry::Directory {
                        metadata: dir_metadata(),
                    });
                }
                Some(FsEntry::File { .. }) => {
                    let bytes = self.read_file(&src).await?;
                    let mut entries = self.entries.write().unwrap();
                    Self::ensure_parents(&mut entries, &dst);
                    let size = bytes.len() as u64;
                    entries.insert(
                        dst,
                        FsEntry::File {
                            content: FileContent::Bytes(bytes),
                            metadata: file_metadata(size, 0o644),
                        },
                    );
                }
                Some(entry @ FsEntry::Symlink { .. }) => {
                    let mut entries = self.entries.write().unwrap();
                    entries.insert(dst, entry);
                }
                None => {}
            }
        }
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        validate_path(target)?;
        let link = self.resolve(link, false)?;
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&link) {
            return Err(fs_errors::already_exists("File exists"));
        }
        entries.insert(
            link,
            FsEntry::Symlink {
                target: target.to_path_buf(),
                metadata: Metadata {
                    file_type: FileType::Symlink,
                    size: 0,
                    mode: 0o777,
                    modified: SystemTime::UNIX_EPOCH,
                    created: SystemTime::UNIX_EPOCH,
                },
            },
        );
        Ok(())
    }

    async fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let path = self.resolve(path, false)?;
        let entries = self.entries.read().unwrap();
        match entries.get(&path) {
            Some(FsEntry::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Invalid argument",
            )
            .into()),
            None => Err(fs_errors::no_such_file()),
        }
    }

    async fn realpath(&self, path: &Path) -> Result<PathBuf> {
        self.resolve(path, true)
    }

    async fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let path = self.resolve(path, true)?;
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(&path) {
            Some(entry) => {
                entry.metadata_mut().mode = mode;
                Ok(())
            }
            None => Err(fs_errors::no_such_file()),
        }
    }

    async fn set_times(&self, path: &Path, modified: SystemTime) -> Result<()> {
        let path = self.resolve(path, true)?;
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(&path) {
            Some(entry) => {
                entry.metadata_mut().modified = modified;
                Ok(())
            }
            None => Err(fs_errors::no_such_file()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_and_read_round_trip() {
        let fs = MemFs::new();
        fs.write_file(Path::new("/tmp/test.txt"), b"hello world")
            .await
            .unwrap();
        let content = fs.read_file(Path::new("/tmp/test.txt")).await.unwrap();
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn binary_content_survives() {
        let fs = MemFs::new();
        let data = vec![0x00, 0xFF, 0x89, 0x50, 0x4E, 0x47];
        fs.write_file(Path::new("/tmp/bin"), &data).await.unwrap();
        assert_eq!(fs.read_file(Path::new("/tmp/bin")).await.unwrap(), data);
    }

    #[tokio::test]
    async fn lazy_provider_runs_once_and_caches() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let fs = MemFs::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let provider: ContentProvider = Arc::new(move || {
            let calls = Arc::clone(&calls2);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(b"generated".to_vec())
            })
        });
        fs.add_lazy_file("/data/gen.txt", provider, 0o644);

        assert_eq!(fs.read_file(Path::new("/data/gen.txt")).await.unwrap(), b"generated");
        assert_eq!(fs.read_file(Path::new("/data/gen.txt")).await.unwrap(), b"generated");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_replaces_lazy_provider() {
        let fs = MemFs::new();
        let provider: ContentProvider =
            Arc::new(|| Box::pin(async { Ok(b"lazy".to_vec()) }));
        fs.add_lazy_file("/data/f", provider, 0o644);
        fs.write_file(Path::new("/data/f"), b"owned").await.unwrap();
        assert_eq!(fs.read_file(Path::new("/data/f")).await.unwrap(), b"owned");
    }

    #[tokio::test]
    async fn dev_null_discards() {
        let fs = MemFs::new();
        fs.write_file(Path::new("/dev/null"), b"gone").await.unwrap();
        assert_eq!(fs.read_file(Path::new("/dev/null")).await.unwrap(), b"");
    }

    #[tokio::test]
    async fn mkdir_requires_parent_without_recursive() {
        let fs = MemFs::new();
        assert!(fs.mkdir(Path::new("/a/b/c"), false).await.is_err());
        fs.mkdir(Path::new("/a/b/c"), true).await.unwrap();
        assert!(fs.exists(Path::new("/a/b")).await.unwrap());
    }

    #[tokio::test]
    async fn remove_non_empty_requires_recursive() {
        let fs = MemFs::new();
        fs.mkdir(Path::new("/d"), false).await.unwrap();
        fs.write_file(Path::new("/d/f"), b"x").await.unwrap();
        assert!(fs.remove(Path::new("/d"), false).await.is_err());
        fs.remove(Path::new("/d"), true).await.unwrap();
        assert!(!fs.exists(Path::new("/d/f")).await.unwrap());
    }

    #[tokio::test]
    async fn rename_moves_directory_children() {
        let fs = MemFs::new();
        fs.mkdir(Path::new("/src/sub"), true).await.unwrap();
        fs.write_file(Path::new("/src/sub/f"), b"x").await.unwrap();
        fs.rename(Path::new("/src"), Path::new("/dst")).await.unwrap();
        assert!(fs.exists(Path::new("/dst/sub/f")).await.unwrap());
        assert!(!fs.exists(Path::new("/src")).await.unwrap());
    }

    #[tokio::test]
    async fn symlinks_resolve_through_directories() {
        let fs = MemFs::new();
        fs.mkdir(Path::new("/data"), false).await.unwrap();
        fs.write_file(Path::new("/data/f"), b"via link").await.unwrap();
        fs.symlink(Path::new("/data"), Path::new("/link")).await.unwrap();
        assert_eq!(fs.read_file(Path::new("/link/f")).await.unwrap(), b"via link");
        assert_eq!(
            fs.realpath(Path::new("/link/f")).await.unwrap(),
            PathBuf::from("/data/f")
        );
    }

    #[tokio::test]
    async fn symlink_loops_are_bounded() {
        let fs = MemFs::new();
        fs.symlink(Path::new("/b"), Path::new("/a")).await.unwrap();
        fs.symlink(Path::new("/a"), Path::new("/b")).await.unwrap();
        let err = fs.read_file(Path::new("/a")).await.unwrap_err();
        assert!(format!("{err}").contains("symbolic links"));
    }

    #[tokio::test]
    async fn null_byte_paths_rejected() {
        use std::ffi::OsStr;
        let fs = MemFs::new();
        let bad = Path::new(OsStr::new("/tmp/a\0b"));
        assert!(fs.read_file(bad).await.is_err());
        assert!(fs.write_file(bad, b"x").await.is_err());
        assert!(fs.mkdir(bad, true).await.is_err());
        assert!(fs.remove(bad, true).await.is_err());
        assert!(fs.stat(bad).await.is_err());
    }

    #[tokio::test]
    async fn readonly_file_rejects_writes() {
        let fs = MemFs::new();
        fs.add_file("/etc/version", "1.0", 0o444);
        let err = fs.write_file(Path::new("/etc/version"), b"2.0").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn copy_recursive_copies_tree() {
        let fs = MemFs::new();
        fs.mkdir(Path::new("/a/b"), true).await.unwrap();
        fs.write_file(Path::new("/a/b/f"), b"x").await.unwrap();
        fs.copy(Path::new("/a"), Path::new("/c"), true).await.unwrap();
        assert_eq!(fs.read_file(Path::new("/c/b/f")).await.unwrap(), b"x");
        assert!(fs.exists(Path::new("/a/b/f")).await.unwrap());
    }
}
