//! Payee identifiers.
//!
//! Block rewards are paid to the collateral owner. The chain identifies the
//! owner by a 20-byte digest of the collateral public key, the same value the
//! registry reports as a node's payee.

use safenode_types::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::blake2b_256;

/// 20-byte payee identifier derived from a collateral public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PayeeId([u8; 20]);

impl PayeeId {
    pub fn from_public_key(public: &PublicKey) -> Self {
        let digest = blake2b_256(public.as_bytes());
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for PayeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayeeId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for PayeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sn{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn payee_is_stable_per_key() {
        let kp = keypair_from_seed(&[3u8; 32]);
        assert_eq!(PayeeId::from_public_key(&kp.public), PayeeId::from_public_key(&kp.public));
    }

    #[test]
    fn display_is_prefixed_hex() {
        let kp = keypair_from_seed(&[4u8; 32]);
        let shown = PayeeId::from_public_key(&kp.public).to_string();
        assert!(shown.starts_with("sn"));
        assert_eq!(shown.len(), 42);
    }
}
