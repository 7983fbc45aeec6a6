//! JSON-RPC protocol implementation
//!
//! Handles request parsing, validation, dispatch to the file store, and
//! response generation.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::Command;
pub use handlers::{dispatch, handle_command};
pub use parser::{Incoming, Request, parse_message, parse_request};
pub use responses::{ErrorObject, Response};
