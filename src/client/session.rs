//! Client session state
//!
//! Tracks what the server knows about one connected client.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client and its request counter.
#[derive(Debug, Clone)]
pub struct ClientSession {
    addr: SocketAddr,
    connected_at: Instant,
    requests_served: u64,
}

impl ClientSession {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connected_at: Instant::now(),
            requests_served: 0,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn record_request(&mut self) {
        self.requests_served += 1;
    }
}
