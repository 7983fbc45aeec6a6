//! Client registry
//!
//! Manages connected clients and enforces the connection limit.

use crate::client::ClientSession;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Registry for tracking active clients
pub struct ClientRegistry {
    clients: HashMap<SocketAddr, ClientSession>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Registers a client, or returns `false` when the registry is full.
    pub fn try_insert(&mut self, addr: SocketAddr) -> bool {
        if self.clients.len() >= self.max_clients {
            return false;
        }
        self.clients.insert(addr, ClientSession::new(addr));
        true
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<ClientSession> {
        self.clients.remove(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&ClientSession> {
        self.clients.get(addr)
    }

    pub fn record_request(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.clients.get_mut(addr) {
            session.record_request();
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut registry = ClientRegistry::new(2);
        assert!(registry.try_insert(addr(1)));
        assert!(registry.try_insert(addr(2)));
        assert!(!registry.try_insert(addr(3)));
        assert_eq!(registry.len(), 2);

        registry.remove(&addr(1));
        assert!(registry.try_insert(addr(3)));
    }

    #[test]
    fn test_request_counting() {
        let mut registry = ClientRegistry::new(1);
        registry.try_insert(addr(1));
        registry.record_request(&addr(1));
        registry.record_request(&addr(1));
        registry.record_request(&addr(9));
        assert_eq!(registry.get(&addr(1)).unwrap().requests_served(), 2);
    }
}
