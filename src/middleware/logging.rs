//! Logging middleware
//!
//! Provides connection and request logging functionality.

use log::{debug, info};
use std::net::SocketAddr;

use crate::client::ClientSession;

/// Log a client connection
pub fn log_connection(client_addr: &SocketAddr, active: usize, max: usize) {
    info!("Client connected: {client_addr} ({active}/{max} clients)");
}

/// Log a received request line
pub fn log_request(client_addr: &SocketAddr, request: &str) {
    debug!("Client {client_addr} sent {} bytes: {request}", request.len());
}

/// Log a client disconnect with its session totals
pub fn log_disconnect(session: &ClientSession) {
    info!(
        "Client {} disconnected after {:.1?} ({} requests)",
        session.addr(),
        session.connected_for(),
        session.requests_served()
    );
}
