//! Error handlers
//!
//! Maps domain errors onto JSON-RPC error codes.

use crate::error::types::{RpcError, StorageError};
use log::{error, warn};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Server-defined range, one code per storage failure.
pub const SERVER_ERROR: i64 = -32000;
pub const PATH_ESCAPES_ROOT: i64 = -32001;
pub const NOT_FOUND: i64 = -32002;
pub const ALREADY_EXISTS: i64 = -32003;
pub const PARENT_MISSING: i64 = -32004;
pub const READ_OUT_OF_RANGE: i64 = -32005;
pub const UNHELD_LOCK: i64 = -32006;
pub const LOCK_TIMEOUT: i64 = -32007;
pub const ROOT_PROTECTED: i64 = -32008;

/// Log a storage failure at a level matching its severity
pub fn handle_storage_error(err: &StorageError) {
    match err {
        StorageError::Io(_) | StorageError::UnheldLock(_) => error!("Storage failure: {err}"),
        _ => warn!("Request rejected: {err}"),
    }
}

/// Convert a storage error to its JSON-RPC error code
pub fn storage_error_code(err: &StorageError) -> i64 {
    match err {
        StorageError::PathEscapesRoot(_) => PATH_ESCAPES_ROOT,
        StorageError::NotFound(_) => NOT_FOUND,
        StorageError::AlreadyExists(_) => ALREADY_EXISTS,
        StorageError::ParentMissing(_) => PARENT_MISSING,
        StorageError::ReadOutOfRange { .. } => READ_OUT_OF_RANGE,
        StorageError::UnheldLock(_) => UNHELD_LOCK,
        StorageError::LockTimeout(_) => LOCK_TIMEOUT,
        StorageError::RootProtected => ROOT_PROTECTED,
        StorageError::Io(_) => SERVER_ERROR,
    }
}

/// Convert a protocol error to its JSON-RPC error code
pub fn rpc_error_code(err: &RpcError) -> i64 {
    match err {
        RpcError::Parse(_) => PARSE_ERROR,
        RpcError::InvalidRequest(_) => INVALID_REQUEST,
        RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
        RpcError::InvalidParams(_) => INVALID_PARAMS,
        RpcError::Internal(_) => INTERNAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_storage_codes_are_distinct() {
        let errors = [
            StorageError::PathEscapesRoot("../x".into()),
            StorageError::NotFound(PathBuf::from("a")),
            StorageError::AlreadyExists(PathBuf::from("a")),
            StorageError::ParentMissing(PathBuf::from("a")),
            StorageError::ReadOutOfRange {
                path: PathBuf::from("a"),
                offset: 3,
                limit: 2,
                length: 1,
            },
            StorageError::UnheldLock("a".into()),
            StorageError::LockTimeout("a".into()),
            StorageError::RootProtected,
            StorageError::Io(std::io::Error::other("boom")),
        ];
        let mut codes: Vec<i64> = errors.iter().map(storage_error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(rpc_error_code(&RpcError::Parse("x".into())), -32700);
        assert_eq!(rpc_error_code(&RpcError::MethodNotFound("x".into())), -32601);
        assert_eq!(rpc_error_code(&RpcError::InvalidParams("x".into())), -32602);
    }
}
