//! Storage operations
//!
//! Implements every file and directory operation exposed to clients. Each
//! operation resolves its path arguments through the [`PathResolver`] before
//! touching the filesystem.

use log::info;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StorageError;
use crate::storage::locks::LockRegistry;
use crate::storage::resolver::{PathResolver, ResolvedPath};
use crate::storage::results::FileInfo;

/// File operations confined to a single root directory.
pub struct FileStore {
    resolver: PathResolver,
    locks: Arc<LockRegistry>,
    lock_timeout: Option<Duration>,
}

/// Existence check that does not follow a final symlink.
fn exists(path: &ResolvedPath) -> bool {
    fs::symlink_metadata(path.as_path()).is_ok()
}

fn ensure_exists(path: &ResolvedPath) -> Result<(), StorageError> {
    if exists(path) {
        Ok(())
    } else {
        Err(StorageError::NotFound(path.as_path().to_path_buf()))
    }
}

fn ensure_absent(path: &ResolvedPath) -> Result<(), StorageError> {
    if exists(path) {
        Err(StorageError::AlreadyExists(path.as_path().to_path_buf()))
    } else {
        Ok(())
    }
}

fn ensure_parent_exists(path: &ResolvedPath) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if parent.is_dir() => Ok(()),
        _ => Err(StorageError::ParentMissing(path.as_path().to_path_buf())),
    }
}

fn ensure_regular_file(path: &ResolvedPath) -> Result<(), StorageError> {
    if path.as_path().is_file() {
        Ok(())
    } else {
        Err(StorageError::NotFound(path.as_path().to_path_buf()))
    }
}

/// Maps a lost create race onto the same error the precondition check gives.
fn create_error(err: io::Error, path: &Path) -> StorageError {
    match err.kind() {
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_path_buf()),
        _ => StorageError::Io(err),
    }
}

impl FileStore {
    pub fn new(resolver: PathResolver, locks: Arc<LockRegistry>, lock_timeout: Option<Duration>) -> Self {
        Self {
            resolver,
            locks,
            lock_timeout,
        }
    }

    /// Opens a store rooted at `root` with its own lock registry and no lock timeout.
    pub fn open(root: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(
            PathResolver::new(root)?,
            Arc::new(LockRegistry::new()),
            None,
        ))
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    pub fn locks(&self) -> &Arc<LockRegistry> {
        &self.locks
    }

    /// Creates an empty file and returns its canonical path.
    pub fn create_file(&self, path: &str) -> Result<String, StorageError> {
        let target = self.resolver.resolve(path)?;
        ensure_parent_exists(&target)?;
        ensure_absent(&target)?;

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target.as_path())
            .map_err(|e| create_error(e, target.as_path()))?;

        info!("Created file at path {target}");
        Ok(target.to_string())
    }

    /// Creates a single directory and returns its canonical path.
    pub fn create_directory(&self, path: &str) -> Result<String, StorageError> {
        let target = self.resolver.resolve(path)?;
        ensure_parent_exists(&target)?;
        ensure_absent(&target)?;

        fs::create_dir(target.as_path()).map_err(|e| create_error(e, target.as_path()))?;

        info!("Created directory at path {target}");
        Ok(target.to_string())
    }

    /// Appends `text` to an existing file while holding the path's lock.
    pub fn append_to_file(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let target = self.resolver.resolve(path)?;
        ensure_regular_file(&target)?;

        // Released on every return path when the guard drops
        let _guard = self.locks.lock(&target.key(), self.lock_timeout)?;

        let mut file = OpenOptions::new().append(true).open(target.as_path())?;
        file.write_all(text.as_bytes())?;

        info!("Appended {} bytes to file at path {target}", text.len());
        Ok(())
    }

    /// Reads the whole file.
    pub fn read_file(&self, path: &str) -> Result<String, StorageError> {
        self.read_file_range(path, 0, -1)
    }

    /// Reads `limit` bytes starting at `offset`, or to the end of the file when
    /// `limit` is negative.
    ///
    /// `offset` must be inside the file, and a non-negative `limit` must not
    /// run past its end. Bytes that are not valid UTF-8 decode to U+FFFD.
    pub fn read_file_range(&self, path: &str, offset: u64, limit: i64) -> Result<String, StorageError> {
        let target = self.resolver.resolve(path)?;
        ensure_regular_file(&target)?;

        let mut file = File::open(target.as_path())?;
        let length = file.metadata()?.len();
        let out_of_range = || StorageError::ReadOutOfRange {
            path: target.as_path().to_path_buf(),
            offset,
            limit,
            length,
        };

        if offset >= length {
            return Err(out_of_range());
        }

        let size = match u64::try_from(limit) {
            Ok(limit) => match offset.checked_add(limit) {
                Some(end) if end <= length => limit,
                _ => return Err(out_of_range()),
            },
            Err(_) => length - offset,
        };

        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = Vec::new();
        file.take(size).read_to_end(&mut bytes)?;
        if (bytes.len() as u64) < size {
            // File shrank between the length check and the read
            return Err(out_of_range());
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Removes a file or an empty directory.
    pub fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolver.resolve(path)?;
        if self.resolver.is_root(&target) {
            return Err(StorageError::RootProtected);
        }
        ensure_exists(&target)?;

        if fs::symlink_metadata(target.as_path())?.is_dir() {
            fs::remove_dir(target.as_path())?;
        } else {
            fs::remove_file(target.as_path())?;
        }

        info!("Deleted file at path {target}");
        Ok(())
    }

    pub fn get_file_info(&self, path: &str) -> Result<FileInfo, StorageError> {
        let target = self.resolver.resolve(path)?;
        ensure_exists(&target)?;

        Ok(FileInfo::from_path(target.as_path())?)
    }

    /// Lists direct children: directories first, then by name within each group.
    pub fn get_directory_children(&self, path: &str) -> Result<Vec<FileInfo>, StorageError> {
        let target = self.resolver.resolve(path)?;
        if !target.as_path().is_dir() {
            return Err(StorageError::NotFound(target.as_path().to_path_buf()));
        }

        let mut children = fs::read_dir(target.as_path())?
            .map(|entry| -> Result<FileInfo, StorageError> {
                Ok(FileInfo::from_path(&entry?.path())?)
            })
            .collect::<Result<Vec<_>, _>>()?;

        children.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        });

        info!("Listed directory {target} - {} entries", children.len());
        Ok(children)
    }

    /// Renames `source` to `destination`. Directories move as a single entry.
    pub fn move_file(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        let source = self.resolver.resolve(source)?;
        let destination = self.resolver.resolve(destination)?;
        if self.resolver.is_root(&source) || self.resolver.is_root(&destination) {
            return Err(StorageError::RootProtected);
        }
        ensure_exists(&source)?;
        ensure_absent(&destination)?;
        ensure_parent_exists(&destination)?;

        fs::rename(source.as_path(), destination.as_path())?;

        info!("Moved {source} to {destination}");
        Ok(())
    }

    /// Copies a file's content to `destination`. A directory source produces a
    /// new empty directory; its children are not copied.
    pub fn copy_file(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        let source = self.resolver.resolve(source)?;
        let destination = self.resolver.resolve(destination)?;
        ensure_exists(&source)?;
        ensure_absent(&destination)?;
        ensure_parent_exists(&destination)?;

        if source.as_path().is_dir() {
            fs::create_dir(destination.as_path())
                .map_err(|e| create_error(e, destination.as_path()))?;
        } else {
            fs::copy(source.as_path(), destination.as_path())?;
        }

        info!("Copied {source} to {destination}");
        Ok(())
    }
}
