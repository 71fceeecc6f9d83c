//! Per-record governance vote counters.
//!
//! The registry only keeps bookkeeping; tallying belongs to the governance
//! subsystem, which drains dirty object hashes from the registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hash of a governance object a record has voted on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GovernanceHash(pub [u8; 32]);

impl fmt::Debug for GovernanceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GovernanceHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for GovernanceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GovernanceVotes {
    counts: BTreeMap<GovernanceHash, u32>,
}

impl GovernanceVotes {
    pub fn add_vote(&mut self, object: GovernanceHash) {
        *self.counts.entry(object).or_insert(0) += 1;
    }

    pub fn remove_object(&mut self, object: &GovernanceHash) -> bool {
        self.counts.remove(object).is_some()
    }

    pub fn count(&self, object: &GovernanceHash) -> u32 {
        self.counts.get(object).copied().unwrap_or(0)
    }

    /// Every object hash voted on, in ascending order.
    pub fn objects(&self) -> Vec<GovernanceHash> {
        self.counts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
