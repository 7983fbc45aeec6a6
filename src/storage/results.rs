//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// Snapshot of a file or directory at the time it was looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
}

impl FileInfo {
    /// Reads metadata for `path`. Dangling symlinks are described by the link itself.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path).or_else(|_| fs::symlink_metadata(path))?;

        Ok(Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_string_lossy().into_owned(),
            size: metadata.len(),
            is_directory: metadata.is_dir(),
        })
    }
}
