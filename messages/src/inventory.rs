//! Content hashes and inventory announcements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blake2b-256 content hash of a message.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageHash(pub [u8; 32]);

impl MessageHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Kind of message an inventory item announces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Broadcast,
    Ping,
    Verification,
}

/// An announcement handed to the transport for relay to peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: InventoryKind,
    pub hash: MessageHash,
}

impl Inventory {
    pub fn new(kind: InventoryKind, hash: MessageHash) -> Self {
        Self { kind, hash }
    }
}
