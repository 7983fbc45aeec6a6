//! Request handlers module for the file server.
//!
//! Routes parsed commands to the [`FileStore`] and converts outcomes into
//! JSON-RPC responses. Storage calls run on tokio's blocking pool because an
//! append may wait on a per-path lock.

use log::{error, info};
use serde_json::Value;
use std::sync::Arc;

use crate::error::handlers::handle_storage_error;
use crate::error::{RpcError, StorageError};
use crate::protocol::commands::Command;
use crate::protocol::parser::{Incoming, parse_message, parse_request};
use crate::protocol::responses::{Response, encode};
use crate::storage::FileStore;

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Io(e.into()))
}

/// Executes a single command against the store.
///
/// Creation methods return the canonical path, reads return the text,
/// metadata calls return [`FileInfo`](crate::storage::FileInfo) objects and
/// everything else returns `null`.
pub fn handle_command(store: &FileStore, command: Command) -> Result<Value, StorageError> {
    match command {
        Command::CreateFile(path) => store.create_file(&path).map(Value::String),
        Command::CreateDirectory(path) => store.create_directory(&path).map(Value::String),
        Command::AppendToFile { path, text } => {
            store.append_to_file(&path, &text).map(|_| Value::Null)
        }
        Command::ReadFile {
            path,
            offset,
            limit,
        } => store
            .read_file_range(&path, offset, limit)
            .map(Value::String),
        Command::DeleteFile(path) => store.delete_file(&path).map(|_| Value::Null),
        Command::GetFileInfo(path) => to_value(store.get_file_info(&path)?),
        Command::GetDirectoryChildren(path) => to_value(store.get_directory_children(&path)?),
        Command::MoveFile {
            source,
            destination,
        } => store.move_file(&source, &destination).map(|_| Value::Null),
        Command::CopyFile {
            source,
            destination,
        } => store.copy_file(&source, &destination).map(|_| Value::Null),
    }
}

/// Handles one request envelope. Returns `None` for notifications.
async fn handle_request(store: &Arc<FileStore>, value: Value) -> Option<Response> {
    let raw_id = value.get("id").cloned();

    let request = match parse_request(value) {
        Ok(request) => request,
        Err(e) => return Some(Response::from_rpc_error(raw_id.unwrap_or(Value::Null), &e)),
    };

    let is_notification = request.is_notification();
    let id = request.id.unwrap_or(Value::Null);

    let command = match Command::from_request(&request.method, request.params) {
        Ok(command) => command,
        Err(e) => {
            info!("Rejected {} request: {e}", request.method);
            return (!is_notification).then(|| Response::from_rpc_error(id, &e));
        }
    };

    info!("Executing {} (id {id})", command.method());

    let store = Arc::clone(store);
    let outcome = tokio::task::spawn_blocking(move || handle_command(&store, command)).await;

    let response = match outcome {
        Ok(Ok(result)) => Response::success(id, result),
        Ok(Err(e)) => {
            handle_storage_error(&e);
            Response::from_storage_error(id, &e)
        }
        Err(e) => {
            error!("Storage task failed: {e}");
            Response::from_rpc_error(id, &RpcError::Internal(e.to_string()))
        }
    };

    (!is_notification).then_some(response)
}

/// Handles one received line and returns the line to send back, if any.
///
/// Batches are executed in order; their responses are collected into one
/// array, and nothing is returned when every member was a notification.
pub async fn dispatch(store: Arc<FileStore>, line: &str) -> Option<String> {
    match parse_message(line) {
        Err(e) => Some(encode(&Response::from_rpc_error(Value::Null, &e))),
        Ok(Incoming::Single(value)) => handle_request(&store, value)
            .await
            .map(|response| encode(&response)),
        Ok(Incoming::Batch(values)) => {
            let mut responses = Vec::with_capacity(values.len());
            for value in values {
                if let Some(response) = handle_request(&store, value).await {
                    responses.push(response);
                }
            }
            (!responses.is_empty()).then(|| encode(&responses))
        }
    }
}
