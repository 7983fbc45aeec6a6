//! Server core functionality
//!
//! This module contains the TCP accept loop and per-connection setup.

pub mod core;

pub use core::Server;
