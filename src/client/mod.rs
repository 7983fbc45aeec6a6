//! Client management system
//!
//! Handles client connections, session bookkeeping, and the per-connection
//! request loop.

pub mod handler;
pub mod registry;
pub mod session;

pub use handler::handle_client;
pub use registry::ClientRegistry;
pub use session::ClientSession;
