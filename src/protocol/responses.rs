//! JSON-RPC response handling
//!
//! Defines response envelopes and their line encoding.

use log::error;
use serde::Serialize;
use serde_json::Value;

use crate::error::handlers::{rpc_error_code, storage_error_code};
use crate::error::{RpcError, StorageError};

const JSONRPC_VERSION: &str = "2.0";

/// Sent if a response itself cannot be serialized.
const INTERNAL_ERROR_LINE: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

/// A JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn from_storage_error(id: Value, err: &StorageError) -> Self {
        Self::failure(id, storage_error_code(err), err.to_string())
    }

    pub fn from_rpc_error(id: Value, err: &RpcError) -> Self {
        Self::failure(id, rpc_error_code(err), err.to_string())
    }
}

/// Encodes a response (or batch of responses) as a single line, without the
/// trailing newline.
pub fn encode<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|e| {
        error!("Failed to serialize response: {e}");
        INTERNAL_ERROR_LINE.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_success_keeps_null_result() {
        let line = encode(&Response::success(json!(1), Value::Null));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": null}));
    }

    #[test]
    fn test_storage_failure() {
        let err = StorageError::NotFound(PathBuf::from("/srv/a.txt"));
        let line = encode(&Response::from_storage_error(json!("req-7"), &err));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], json!("req-7"));
        assert_eq!(value["error"]["code"], json!(-32002));
        assert_eq!(
            value["error"]["message"],
            json!("No file or directory at path /srv/a.txt")
        );
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_internal_error_line_is_valid_json() {
        let value: Value = serde_json::from_str(INTERNAL_ERROR_LINE).unwrap();
        assert_eq!(value["error"]["code"], json!(-32603));
    }
}
