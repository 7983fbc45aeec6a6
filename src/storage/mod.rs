//! File system storage management
//!
//! Handles path confinement, per-path write locks, and the file operations
//! exposed to clients.

pub mod locks;
pub mod operations;
pub mod resolver;
pub mod results;

pub use locks::{LockRegistry, PathLockGuard};
pub use operations::FileStore;
pub use resolver::{PathResolver, ResolvedPath};
pub use results::FileInfo;
