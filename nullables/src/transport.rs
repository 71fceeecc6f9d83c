//! Nullable transport: record relays and connections without sending.

use parking_lot::Mutex;
use safenode_messages::Inventory;
use safenode_node::Transport;
use safenode_types::ServiceAddr;
use std::sync::atomic::{AtomicBool, Ordering};

/// A test transport that records what the node asked it to do.
#[derive(Default)]
pub struct NullTransport {
    relayed: Mutex<Vec<Inventory>>,
    connections: Mutex<Vec<ServiceAddr>>,
    refuse_connections: AtomicBool,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every inventory relayed so far (for assertions).
    pub fn relayed(&self) -> Vec<Inventory> {
        self.relayed.lock().clone()
    }

    pub fn connections(&self) -> Vec<ServiceAddr> {
        self.connections.lock().clone()
    }

    /// Make every later `connect` fail.
    pub fn refuse_connections(&self) {
        self.refuse_connections.store(true, Ordering::SeqCst);
    }

    /// Clear all state.
    pub fn reset(&self) {
        self.relayed.lock().clear();
        self.connections.lock().clear();
        self.refuse_connections.store(false, Ordering::SeqCst);
    }
}

impl Transport for NullTransport {
    fn relay(&self, inventory: Inventory) {
        self.relayed.lock().push(inventory);
    }

    fn connect(&self, addr: ServiceAddr) -> bool {
        if self.refuse_connections.load(Ordering::SeqCst) {
            return false;
        }
        self.connections.lock().push(addr);
        true
    }
}
