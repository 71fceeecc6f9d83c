//! Bounded memory of message hashes already processed.

use safenode_messages::MessageHash;
use std::collections::{HashSet, VecDeque};

/// Track the last 65 536 hashes per message kind.
pub const DEFAULT_SEEN_CAPACITY: usize = 65_536;

/// Rolling set of seen message hashes, evicting the oldest at capacity.
pub struct SeenMessages {
    capacity: usize,
    hashes: HashSet<MessageHash>,
    order: VecDeque<MessageHash>,
}

impl SeenMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hashes: HashSet::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn contains(&self, hash: &MessageHash) -> bool {
        self.hashes.contains(hash)
    }

    /// Record `hash`. Returns `false` if it was already present.
    pub fn insert(&mut self, hash: MessageHash) -> bool {
        if self.hashes.contains(&hash) {
            return false;
        }
        if self.capacity == 0 {
            return true;
        }
        if self.hashes.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.hashes.remove(&oldest);
            }
        }
        self.hashes.insert(hash);
        self.order.push_back(hash);
        true
    }

    /// Forget `hash` so a newer copy of the same message can be processed.
    pub fn remove(&mut self, hash: &MessageHash) {
        if self.hashes.remove(hash) {
            self.order.retain(|h| h != hash);
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl Default for SeenMessages {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}
