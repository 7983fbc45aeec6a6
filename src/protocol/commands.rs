//! Module `commands`
//!
//! Defines the file operations a client can invoke and turns a JSON-RPC
//! method name plus its params into one of them.

use serde_json::Value;

use crate::error::RpcError;

/// A file operation requested by a client, with its arguments already
/// extracted and typed.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateFile(String),
    CreateDirectory(String),
    AppendToFile { path: String, text: String },
    /// A negative `limit` reads to the end of the file.
    ReadFile { path: String, offset: u64, limit: i64 },
    DeleteFile(String),
    GetFileInfo(String),
    GetDirectoryChildren(String),
    MoveFile { source: String, destination: String },
    CopyFile { source: String, destination: String },
}

/// Parameter names per method, in positional order. Used to accept named params.
fn param_names(method: &str) -> Option<&'static [&'static str]> {
    let names: &'static [&'static str] = match method {
        "createFile" | "createDirectory" | "deleteFile" | "getFileInfo"
        | "getDirectoryChildren" => &["path"],
        "appendToFile" => &["path", "text"],
        "readFile" => &["path", "offset", "limit"],
        "moveFile" | "copyFile" => &["source", "destination"],
        _ => return None,
    };
    Some(names)
}

/// Positional arguments of a single call.
struct Params<'a> {
    method: &'a str,
    values: Vec<Value>,
}

impl<'a> Params<'a> {
    fn new(method: &'a str, names: &[&str], params: Option<Value>) -> Result<Self, RpcError> {
        let values = match params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(Value::Object(mut fields)) => {
                // Named params fill positions in order until the first gap
                let values: Vec<Value> = names
                    .iter()
                    .map_while(|name| fields.remove(*name))
                    .collect();
                if let Some(unknown) = fields.keys().next() {
                    return Err(RpcError::InvalidParams(format!(
                        "{method}: unexpected parameter '{unknown}'"
                    )));
                }
                values
            }
            Some(_) => {
                return Err(RpcError::InvalidRequest(
                    "params must be an array or an object".into(),
                ));
            }
        };
        Ok(Self { method, values })
    }

    fn expect_len(&self, expected: usize) -> Result<(), RpcError> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(self.invalid(format!(
                "expected {expected} argument(s), got {}",
                self.values.len()
            )))
        }
    }

    fn invalid(&self, reason: String) -> RpcError {
        RpcError::InvalidParams(format!("{}: {reason}", self.method))
    }

    fn string(&self, index: usize) -> Result<String, RpcError> {
        match &self.values[index] {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.invalid(format!("argument {index} must be a string, got {other}"))),
        }
    }

    fn u64(&self, index: usize) -> Result<u64, RpcError> {
        self.values[index]
            .as_u64()
            .ok_or_else(|| self.invalid(format!("argument {index} must be a non-negative integer")))
    }

    fn i64(&self, index: usize) -> Result<i64, RpcError> {
        self.values[index]
            .as_i64()
            .ok_or_else(|| self.invalid(format!("argument {index} must be an integer")))
    }
}

impl Command {
    /// Builds a command from a method name and its params.
    ///
    /// `readFile` accepts either just a path (whole file) or a path, an
    /// offset and a limit.
    pub fn from_request(method: &str, params: Option<Value>) -> Result<Command, RpcError> {
        let names =
            param_names(method).ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;
        let args = Params::new(method, names, params)?;

        let command = match method {
            "createFile" => {
                args.expect_len(1)?;
                Command::CreateFile(args.string(0)?)
            }
            "createDirectory" => {
                args.expect_len(1)?;
                Command::CreateDirectory(args.string(0)?)
            }
            "appendToFile" => {
                args.expect_len(2)?;
                Command::AppendToFile {
                    path: args.string(0)?,
                    text: args.string(1)?,
                }
            }
            "readFile" => match args.values.len() {
                1 => Command::ReadFile {
                    path: args.string(0)?,
                    offset: 0,
                    limit: -1,
                },
                3 => Command::ReadFile {
                    path: args.string(0)?,
                    offset: args.u64(1)?,
                    limit: args.i64(2)?,
                },
                n => {
                    return Err(args.invalid(format!("expected 1 or 3 arguments, got {n}")));
                }
            },
            "deleteFile" => {
                args.expect_len(1)?;
                Command::DeleteFile(args.string(0)?)
            }
            "getFileInfo" => {
                args.expect_len(1)?;
                Command::GetFileInfo(args.string(0)?)
            }
            "getDirectoryChildren" => {
                args.expect_len(1)?;
                Command::GetDirectoryChildren(args.string(0)?)
            }
            "moveFile" => {
                args.expect_len(2)?;
                Command::MoveFile {
                    source: args.string(0)?,
                    destination: args.string(1)?,
                }
            }
            "copyFile" => {
                args.expect_len(2)?;
                Command::CopyFile {
                    source: args.string(0)?,
                    destination: args.string(1)?,
                }
            }
            _ => return Err(RpcError::MethodNotFound(method.to_string())),
        };

        Ok(command)
    }

    /// The JSON-RPC method name of this command.
    pub fn method(&self) -> &'static str {
        match self {
            Command::CreateFile(_) => "createFile",
            Command::CreateDirectory(_) => "createDirectory",
            Command::AppendToFile { .. } => "appendToFile",
            Command::ReadFile { .. } => "readFile",
            Command::DeleteFile(_) => "deleteFile",
            Command::GetFileInfo(_) => "getFileInfo",
            Command::GetDirectoryChildren(_) => "getDirectoryChildren",
            Command::MoveFile { .. } => "moveFile",
            Command::CopyFile { .. } => "copyFile",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_path_commands() {
        assert_eq!(
            Command::from_request("createFile", Some(json!(["a.txt"]))).unwrap(),
            Command::CreateFile("a.txt".into())
        );
        assert_eq!(
            Command::from_request("deleteFile", Some(json!(["a.txt"]))).unwrap(),
            Command::DeleteFile("a.txt".into())
        );
        assert_eq!(
            Command::from_request("getDirectoryChildren", Some(json!(["dir"]))).unwrap(),
            Command::GetDirectoryChildren("dir".into())
        );
    }

    #[test]
    fn test_parse_read_file_overloads() {
        assert_eq!(
            Command::from_request("readFile", Some(json!(["a.txt"]))).unwrap(),
            Command::ReadFile {
                path: "a.txt".into(),
                offset: 0,
                limit: -1
            }
        );
        assert_eq!(
            Command::from_request("readFile", Some(json!(["a.txt", 4, 3]))).unwrap(),
            Command::ReadFile {
                path: "a.txt".into(),
                offset: 4,
                limit: 3
            }
        );
        assert!(matches!(
            Command::from_request("readFile", Some(json!(["a.txt", 4]))),
            Err(RpcError::InvalidParams(_))
        ));
        assert!(matches!(
            Command::from_request("readFile", Some(json!(["a.txt", -1, 3]))),
            Err(RpcError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_parse_named_params() {
        assert_eq!(
            Command::from_request(
                "moveFile",
                Some(json!({"source": "a", "destination": "b"}))
            )
            .unwrap(),
            Command::MoveFile {
                source: "a".into(),
                destination: "b".into()
            }
        );
        assert_eq!(
            Command::from_request("readFile", Some(json!({"path": "a"}))).unwrap(),
            Command::ReadFile {
                path: "a".into(),
                offset: 0,
                limit: -1
            }
        );
        assert!(matches!(
            Command::from_request("createFile", Some(json!({"file": "a"}))),
            Err(RpcError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_wrong_arity_and_types() {
        assert!(matches!(
            Command::from_request("appendToFile", Some(json!(["a.txt"]))),
            Err(RpcError::InvalidParams(_))
        ));
        assert!(matches!(
            Command::from_request("createFile", Some(json!([42]))),
            Err(RpcError::InvalidParams(_))
        ));
        assert!(matches!(
            Command::from_request("createFile", None),
            Err(RpcError::InvalidParams(_))
        ));
        assert!(matches!(
            Command::from_request("createFile", Some(json!("a.txt"))),
            Err(RpcError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unknown_method() {
        assert!(matches!(
            Command::from_request("formatDisk", Some(json!([]))),
            Err(RpcError::MethodNotFound(_))
        ));
    }

    #[test]
    fn test_method_names_round_trip() {
        let command = Command::CopyFile {
            source: "a".into(),
            destination: "b".into(),
        };
        assert_eq!(command.method(), "copyFile");
    }
}
