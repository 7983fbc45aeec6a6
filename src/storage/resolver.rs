//! Path resolution
//!
//! Confines caller-supplied relative paths to the configured root directory.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// A canonical absolute path that has been checked to lie inside the root directory.
///
/// Only [`PathResolver::resolve`] constructs these, so holding one means the
/// confinement check already ran.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    path: PathBuf,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Key used by the lock registry. Two spellings of the same file, including
    /// ones that reach it through a symlink, share it.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Resolves relative paths against a canonical root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Canonicalizes `root`, which must be an existing directory.
    pub fn new(root: &Path) -> Result<Self, StorageError> {
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(StorageError::NotFound(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_root(&self, path: &ResolvedPath) -> bool {
        path.as_path() == self.root
    }

    /// Joins `relative` onto the root, collapses `.` and `..` lexically, then
    /// canonicalizes the result on disk.
    ///
    /// Leading `/` and drive prefixes are ignored, so absolute-looking input
    /// stays relative to the root. A `..` that would climb above the root
    /// fails with [`StorageError::PathEscapesRoot`], even if later segments
    /// would come back inside. Symlinks are followed, and the real location
    /// must still lie under the root.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        let mut lexical = self.root.clone();

        for component in Path::new(relative).components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    if lexical == self.root {
                        return Err(StorageError::PathEscapesRoot(relative.to_string()));
                    }
                    lexical.pop();
                }
                Component::Normal(segment) => lexical.push(segment),
            }
        }

        let resolved = canonicalize_partial(&lexical)?;

        // Path::starts_with compares whole segments: /root2 is not under /root
        if !resolved.starts_with(&self.root) {
            return Err(StorageError::PathEscapesRoot(relative.to_string()));
        }

        Ok(ResolvedPath { path: resolved })
    }
}

/// Canonicalizes the deepest existing ancestor of `path` and re-appends the
/// segments that do not exist yet.
///
/// A dangling symlink in final position counts as not existing, so it is
/// kept as a name under its canonical parent rather than followed.
fn canonicalize_partial(path: &Path) -> Result<PathBuf, StorageError> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut real) => {
                real.extend(missing.iter().rev());
                return Ok(real);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name);
                        existing = parent;
                    }
                    _ => return Err(StorageError::Io(e)),
                }
            }
            Err(e) => return Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> (TempDir, PathResolver) {
        let dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_resolve_plain_relative_path() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve("a/b/c.txt").unwrap();
        assert_eq!(resolved.as_path(), resolver.root().join("a/b/c.txt"));
    }

    #[test]
    fn test_resolve_empty_path_is_root() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve("").unwrap();
        assert!(resolver.is_root(&resolved));
        assert!(resolver.is_root(&resolver.resolve(".").unwrap()));
    }

    #[test]
    fn test_resolve_collapses_dots_inside_root() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve("a/./b/../c.txt").unwrap();
        assert_eq!(resolved.as_path(), resolver.root().join("a/c.txt"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_dir, resolver) = resolver();
        for input in ["..", "../x", "a/../../x", "a/b/../../../etc/passwd"] {
            assert!(
                matches!(
                    resolver.resolve(input),
                    Err(StorageError::PathEscapesRoot(_))
                ),
                "{input} should escape"
            );
        }
    }

    #[test]
    fn test_resolve_rejects_round_trip_through_parent() {
        let (_dir, resolver) = resolver();
        let name = resolver
            .root()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let sneaky = format!("../{name}/file.txt");
        assert!(matches!(
            resolver.resolve(&sneaky),
            Err(StorageError::PathEscapesRoot(_))
        ));
    }

    #[test]
    fn test_resolve_treats_absolute_as_relative() {
        let (_dir, resolver) = resolver();
        let resolved = resolver.resolve("/etc/passwd").unwrap();
        assert_eq!(resolved.as_path(), resolver.root().join("etc/passwd"));
    }

    #[test]
    fn test_resolve_sibling_with_common_prefix_is_rejected() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(parent.path().join("root2")).unwrap();
        let resolver = PathResolver::new(&root).unwrap();

        assert!(matches!(
            resolver.resolve("../root2/file"),
            Err(StorageError::PathEscapesRoot(_))
        ));
    }

    #[test]
    fn test_different_spellings_share_a_key() {
        let (_dir, resolver) = resolver();
        let a = resolver.resolve("dir/file.txt").unwrap();
        let b = resolver.resolve("./dir/sub/../file.txt").unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_leaving_root() {
        use std::os::unix::fs::symlink;

        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        let outside = parent.path().join("outside");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(&outside).unwrap();
        std::fs::write(outside.join("secret.txt"), "top secret").unwrap();
        symlink(&outside, root.join("link")).unwrap();
        let resolver = PathResolver::new(&root).unwrap();

        for input in ["link", "link/secret.txt", "link/planted.txt", "link/new/deeper"] {
            assert!(
                matches!(
                    resolver.resolve(input),
                    Err(StorageError::PathEscapesRoot(_))
                ),
                "{input} should escape"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_shares_key_with_target() {
        use std::os::unix::fs::symlink;

        let (_dir, resolver) = resolver();
        std::fs::create_dir(resolver.root().join("real")).unwrap();
        std::fs::write(resolver.root().join("real/x"), "").unwrap();
        symlink(resolver.root().join("real"), resolver.root().join("alias")).unwrap();

        let via_link = resolver.resolve("alias/x").unwrap();
        let direct = resolver.resolve("real/x").unwrap();
        assert_eq!(via_link.key(), direct.key());
        assert_eq!(via_link.as_path(), resolver.root().join("real/x"));

        let missing = resolver.resolve("alias/new.txt").unwrap();
        assert_eq!(missing.as_path(), resolver.root().join("real/new.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_not_followed() {
        use std::os::unix::fs::symlink;

        let parent = TempDir::new().unwrap();
        let root = parent.path().join("root");
        std::fs::create_dir(&root).unwrap();
        symlink(parent.path().join("nowhere"), root.join("dangling")).unwrap();
        let resolver = PathResolver::new(&root).unwrap();

        let resolved = resolver.resolve("dangling").unwrap();
        assert_eq!(resolved.as_path(), resolver.root().join("dangling"));
    }

    #[test]
    fn test_resolve_below_a_file_keeps_missing_segments() {
        let (_dir, resolver) = resolver();
        std::fs::write(resolver.root().join("file.txt"), "").unwrap();
        let resolved = resolver.resolve("file.txt/child").unwrap();
        assert_eq!(resolved.as_path(), resolver.root().join("file.txt/child"));
    }

    #[test]
    fn test_new_requires_existing_root() {
        let dir = TempDir::new().unwrap();
        assert!(PathResolver::new(&dir.path().join("missing")).is_err());
    }
}
