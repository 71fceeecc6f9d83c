//! Liveness pings signed by a node's operational key.

use safenode_crypto::{blake2b_256_multi, sign_message, verify_signature};
use safenode_types::{BlockHash, Outpoint, PrivateKey, PublicKey, Signature, Timestamp};
use serde::{Deserialize, Serialize};

use crate::codec::canonical;
use crate::inventory::{Inventory, InventoryKind, MessageHash};
use crate::rejection::{Rejection, MISBEHAVIOR_MINOR, MISBEHAVIOR_MISMATCH};

const PING_DOMAIN: &[u8] = b"safenode-ping";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingMessage {
    pub outpoint: Outpoint,
    /// Chain tip seen by the signer when the ping was produced.
    pub block_hash: BlockHash,
    pub sig_time: Timestamp,
    pub signature: Signature,
}

impl PingMessage {
    /// Build and sign a ping for `outpoint` at the given chain tip.
    pub fn new_signed(
        outpoint: Outpoint,
        block_hash: BlockHash,
        now: Timestamp,
        operator_key: &PrivateKey,
    ) -> Self {
        let mut ping = Self {
            outpoint,
            block_hash,
            sig_time: now,
            signature: Signature([0u8; 64]),
        };
        ping.sign(operator_key);
        ping
    }

    /// Bytes covered by the operational signature.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = PING_DOMAIN.to_vec();
        bytes.extend(canonical(&(self.outpoint, self.block_hash, self.sig_time)));
        bytes
    }

    pub fn sign(&mut self, operator_key: &PrivateKey) {
        self.signature = sign_message(&self.signing_bytes(), operator_key);
    }

    /// H(outpoint ‖ signing time).
    pub fn hash(&self) -> MessageHash {
        MessageHash(blake2b_256_multi(&[
            &canonical(&self.outpoint),
            &canonical(&self.sig_time),
        ]))
    }

    pub fn inventory(&self) -> Inventory {
        Inventory::new(InventoryKind::Ping, self.hash())
    }

    /// Reject pings signed too far in the future.
    pub fn simple_check(&self, now: Timestamp, max_future_drift: u64) -> Result<(), Rejection> {
        if self.sig_time > now.saturating_add(max_future_drift) {
            return Err(Rejection::structural(
                format!("ping for {} signed too far in the future", self.outpoint),
                MISBEHAVIOR_MINOR,
            ));
        }
        Ok(())
    }

    pub fn verify(&self, operator_key: &PublicKey) -> bool {
        verify_signature(&self.signing_bytes(), &self.signature, operator_key)
    }

    pub fn check_signature(&self, operator_key: &PublicKey) -> Result<(), Rejection> {
        if self.verify(operator_key) {
            Ok(())
        } else {
            Err(Rejection::cryptographic(
                format!("bad ping signature for {}", self.outpoint),
                MISBEHAVIOR_MISMATCH,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safenode_crypto::keypair_from_seed;
    use safenode_types::TxHash;

    fn outpoint() -> Outpoint {
        Outpoint::new(TxHash::new([7u8; 32]), 1)
    }

    #[test]
    fn signed_ping_verifies() {
        let key = keypair_from_seed(&[1u8; 32]);
        let ping = PingMessage::new_signed(
            outpoint(),
            BlockHash::new([2u8; 32]),
            Timestamp::new(1_000),
            &key.private,
        );
        assert!(ping.check_signature(&key.public).is_ok());

        let other = keypair_from_seed(&[9u8; 32]);
        let err = ping.check_signature(&other.public).unwrap_err();
        assert_eq!(err.misbehavior(), 33);
    }

    #[test]
    fn tampering_breaks_signature() {
        let key = keypair_from_seed(&[1u8; 32]);
        let mut ping = PingMessage::new_signed(
            outpoint(),
            BlockHash::new([2u8; 32]),
            Timestamp::new(1_000),
            &key.private,
        );
        ping.sig_time = Timestamp::new(1_001);
        assert!(!ping.verify(&key.public));
    }

    #[test]
    fn hash_ignores_block_and_signature() {
        let key = keypair_from_seed(&[1u8; 32]);
        let at = Timestamp::new(5);
        let a = PingMessage::new_signed(outpoint(), BlockHash::new([2u8; 32]), at, &key.private);
        let b = PingMessage::new_signed(outpoint(), BlockHash::new([3u8; 32]), at, &key.private);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn future_drift_is_structural() {
        let key = keypair_from_seed(&[1u8; 32]);
        let now = Timestamp::new(10_000);
        let late = now.saturating_add(3_601);
        let ping = PingMessage::new_signed(outpoint(), BlockHash::ZERO, late, &key.private);
        let err = ping.simple_check(now, 3_600).unwrap_err();
        assert_eq!(err.misbehavior(), 1);

        let edge = now.saturating_add(3_600);
        let ok = PingMessage::new_signed(outpoint(), BlockHash::ZERO, edge, &key.private);
        assert!(ok.simple_check(now, 3_600).is_ok());
    }
}
