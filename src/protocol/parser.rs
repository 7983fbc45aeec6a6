//! JSON-RPC message parsing
//!
//! Turns a received line into one or more request envelopes.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::RpcError;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    /// `None` when the member is absent (a notification). An explicit
    /// `"id": null` is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A received line: either one request or a batch of them.
#[derive(Debug)]
pub enum Incoming {
    Single(Value),
    Batch(Vec<Value>),
}

/// Parses a line of JSON into a single message or a non-empty batch.
pub fn parse_message(line: &str) -> Result<Incoming, RpcError> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| RpcError::Parse(e.to_string()))?;

    match value {
        Value::Array(values) if values.is_empty() => {
            Err(RpcError::InvalidRequest("empty batch".into()))
        }
        Value::Array(values) => Ok(Incoming::Batch(values)),
        value => Ok(Incoming::Single(value)),
    }
}

/// Validates the envelope of a single request.
pub fn parse_request(value: Value) -> Result<Request, RpcError> {
    if !value.is_object() {
        return Err(RpcError::InvalidRequest("request must be an object".into()));
    }

    let request: Request =
        serde_json::from_value(value).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;

    if request.jsonrpc != "2.0" {
        return Err(RpcError::InvalidRequest(format!(
            "unsupported jsonrpc version '{}'",
            request.jsonrpc
        )));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_request() {
        let incoming = parse_message(
            r#"{"jsonrpc":"2.0","method":"createFile","params":["a.txt"],"id":1}"#,
        )
        .unwrap();
        let Incoming::Single(value) = incoming else {
            panic!("expected a single request");
        };
        let request = parse_request(value).unwrap();
        assert_eq!(request.method, "createFile");
        assert_eq!(request.params, Some(json!(["a.txt"])));
        assert_eq!(request.id, Some(json!(1)));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_null_id_is_not_a_notification() {
        let request =
            parse_request(json!({"jsonrpc": "2.0", "method": "readFile", "id": null})).unwrap();
        assert_eq!(request.id, Some(Value::Null));

        let request = parse_request(json!({"jsonrpc": "2.0", "method": "readFile"})).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_parse_batch() {
        let incoming = parse_message(
            r#"[{"jsonrpc":"2.0","method":"a","id":1},{"jsonrpc":"2.0","method":"b"}]"#,
        )
        .unwrap();
        assert!(matches!(incoming, Incoming::Batch(ref values) if values.len() == 2));
    }

    #[test]
    fn test_invalid_messages() {
        assert!(matches!(parse_message("{not json"), Err(RpcError::Parse(_))));
        assert!(matches!(parse_message("[]"), Err(RpcError::InvalidRequest(_))));
        assert!(matches!(
            parse_request(json!(42)),
            Err(RpcError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_request(json!({"jsonrpc": "1.0", "method": "a", "id": 1})),
            Err(RpcError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_request(json!({"jsonrpc": "2.0", "id": 1})),
            Err(RpcError::InvalidRequest(_))
        ));
    }
}
