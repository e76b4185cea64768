//! Path normalization and sandbox-boundary checks.

use std::io::{Error as IoError, ErrorKind};
use std::path::{Component, Path, PathBuf};

use crate::error::Result;

/// Reject paths containing NUL bytes.
///
/// Every [`FileSystem`](super::FileSystem) operation calls this before
/// touching storage; a NUL byte in a path is never meaningful and is a
/// common smuggling vector when paths cross FFI boundaries.
pub fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(IoError::new(ErrorKind::InvalidInput, "path contains null byte").into());
    }
    Ok(())
}

/// Normalize a path to absolute form against `cwd`, resolving `.` and `..`
/// lexically. `..` above the root stays at the root.
pub fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    normalize_path(&joined)
}

/// Collapse `.` and `..` components of an absolute path.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => result.push("/"),
            Component::Normal(name) => result.push(name),
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    if result.as_os_str().is_empty() {
        result.push("/");
    }
    result
}

/// Whether `path` is confined to `root`: equal to it, or below it with a
/// real separator. `/sandbox` does not confine `/sandboxes`.
///
/// Callers must canonicalize `path` first; this is a pure string check and
/// an adapter that forgets to resolve symlinks can still escape.
pub fn is_path_within_root(path: &Path, root: &Path) -> bool {
    let path = normalize_path(path);
    let root = normalize_path(root);
    if path == root {
        return true;
    }
    let root_str = root.to_string_lossy();
    let prefix = if root_str.ends_with('/') {
        root_str.to_string()
    } else {
        format!("{root_str}/")
    };
    path.to_string_lossy().starts_with(&prefix)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_null_bytes() {
        use std::ffi::OsStr;
        let raw = OsStr::new("/tmp/a\0b");
        assert!(validate_path(Path::new(raw)).is_err());
        assert!(validate_path(Path::new("/tmp/ab")).is_ok());
    }

    #[test]
    fn normalizes_dots() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize_path(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn resolves_relative_against_cwd() {
        assert_eq!(
            resolve_path(Path::new("/home/user"), Path::new("notes.txt")),
            PathBuf::from("/home/user/notes.txt")
        );
        assert_eq!(
            resolve_path(Path::new("/home/user"), Path::new("../shared")),
            PathBuf::from("/home/shared")
        );
        assert_eq!(
            resolve_path(Path::new("/home/user"), Path::new("/etc/hosts")),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn root_boundary_is_exact_or_slash_prefixed() {
        let root = Path::new("/sandbox");
        assert!(is_path_within_root(Path::new("/sandbox"), root));
        assert!(is_path_within_root(Path::new("/sandbox/work/a.txt"), root));
        assert!(!is_path_within_root(Path::new("/sandboxes"), root));
        assert!(!is_path_within_root(Path::new("/sandboxes/x"), root));
        assert!(!is_path_within_root(Path::new("/"), root));
        assert!(!is_path_within_root(Path::new("/sandbox/../etc"), root));
    }
}
