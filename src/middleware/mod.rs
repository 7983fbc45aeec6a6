//! Server middleware
//!
//! Provides request and connection logging.

pub mod logging;
