//! Error types
//!
//! Defines domain-specific error types for each layer of the file server.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Storage module errors
///
/// Every variant is a caller-visible failure of a single request. None of them
/// leave partial state behind.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Path escapes the root directory: {0}")]
    PathEscapesRoot(String),

    #[error("No file or directory at path {}", .0.display())]
    NotFound(PathBuf),

    #[error("A file or directory already exists at path {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Parent directory does not exist for path {}", .0.display())]
    ParentMissing(PathBuf),

    #[error("Impossible to read at offset {offset} with limit {limit}: the file at {} is {length} bytes long", .path.display())]
    ReadOutOfRange {
        path: PathBuf,
        offset: u64,
        limit: i64,
        length: u64,
    },

    #[error("Trying to unlock a key ({0}) where we didn't acquire the lock previously")]
    UnheldLock(String),

    #[error("Timed out waiting for the lock on {0}")]
    LockTimeout(String),

    #[error("The root directory cannot be deleted or moved")]
    RootProtected,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Wire protocol errors, raised before a request reaches the storage layer.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// General server error that encompasses all error types
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
