//! Address verification challenges.
//!
//! A challenger sends an unsigned request to an address. The node listening
//! there answers by signing (address, nonce, anchor hash) with its
//! operational key. The challenger then countersigns the whole exchange,
//! binding both outpoints, and relays the completed message so every peer
//! can adjust PoSe scores.

use safenode_crypto::{blake2b_256_multi, sign_message, verify_signature};
use safenode_types::{BlockHash, Outpoint, PrivateKey, PublicKey, ServiceAddr, Signature};
use serde::{Deserialize, Serialize};

use crate::codec::canonical;
use crate::inventory::{Inventory, InventoryKind, MessageHash};
use crate::rejection::{Rejection, MISBEHAVIOR_BAD_VERIFICATION};

const REPLY_DOMAIN: &[u8] = b"safenode-verify-reply";
const ATTESTATION_DOMAIN: &[u8] = b"safenode-verify-attest";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMessage {
    /// Node that answered the challenge.
    pub outpoint1: Outpoint,
    /// Node that issued the challenge.
    pub outpoint2: Outpoint,
    pub addr: ServiceAddr,
    pub nonce: u32,
    /// Height of the anchor block whose hash both signatures cover.
    pub height: u32,
    pub sig1: Option<Signature>,
    pub sig2: Option<Signature>,
}

impl VerificationMessage {
    pub fn request(addr: ServiceAddr, nonce: u32, height: u32) -> Self {
        Self {
            outpoint1: Outpoint::default(),
            outpoint2: Outpoint::default(),
            addr,
            nonce,
            height,
            sig1: None,
            sig2: None,
        }
    }

    fn reply_bytes(&self, anchor: &BlockHash) -> Vec<u8> {
        let mut bytes = REPLY_DOMAIN.to_vec();
        bytes.extend(canonical(&(self.addr, self.nonce, anchor)));
        bytes
    }

    fn attestation_bytes(&self, anchor: &BlockHash) -> Vec<u8> {
        let mut bytes = ATTESTATION_DOMAIN.to_vec();
        bytes.extend(canonical(&(
            self.addr,
            self.nonce,
            anchor,
            self.outpoint1,
            self.outpoint2,
        )));
        bytes
    }

    /// Answer a challenge as the node at `addr`.
    pub fn sign_reply(&mut self, outpoint1: Outpoint, operator_key: &PrivateKey, anchor: &BlockHash) {
        self.outpoint1 = outpoint1;
        self.sig1 = Some(sign_message(&self.reply_bytes(anchor), operator_key));
    }

    /// Countersign a reply as the challenger.
    pub fn sign_attestation(
        &mut self,
        outpoint2: Outpoint,
        operator_key: &PrivateKey,
        anchor: &BlockHash,
    ) {
        self.outpoint2 = outpoint2;
        self.sig2 = Some(sign_message(&self.attestation_bytes(anchor), operator_key));
    }

    pub fn is_complete(&self) -> bool {
        self.sig1.is_some() && self.sig2.is_some()
    }

    /// Verify both signatures against the two records' operational keys.
    pub fn check_signatures(
        &self,
        replier_key: &PublicKey,
        challenger_key: &PublicKey,
        anchor: &BlockHash,
    ) -> Result<(), Rejection> {
        let reply_ok = self
            .sig1
            .is_some_and(|sig| verify_signature(&self.reply_bytes(anchor), &sig, replier_key));
        if !reply_ok {
            return Err(Rejection::cryptographic(
                format!("bad reply signature from {}", self.outpoint1),
                MISBEHAVIOR_BAD_VERIFICATION,
            ));
        }
        let attest_ok = self.sig2.is_some_and(|sig| {
            verify_signature(&self.attestation_bytes(anchor), &sig, challenger_key)
        });
        if !attest_ok {
            return Err(Rejection::cryptographic(
                format!("bad attestation signature from {}", self.outpoint2),
                MISBEHAVIOR_BAD_VERIFICATION,
            ));
        }
        Ok(())
    }

    /// H(outpoint1 ‖ outpoint2 ‖ address ‖ nonce ‖ height).
    pub fn hash(&self) -> MessageHash {
        MessageHash(blake2b_256_multi(&[
            &canonical(&self.outpoint1),
            &canonical(&self.outpoint2),
            &canonical(&self.addr),
            &self.nonce.to_le_bytes(),
            &self.height.to_le_bytes(),
        ]))
    }

    pub fn inventory(&self) -> Inventory {
        Inventory::new(InventoryKind::Verification, self.hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safenode_crypto::keypair_from_seed;
    use safenode_types::TxHash;

    fn exchange() -> (VerificationMessage, BlockHash) {
        let anchor = BlockHash::new([3u8; 32]);
        let replier = keypair_from_seed(&[1u8; 32]);
        let challenger = keypair_from_seed(&[2u8; 32]);
        let mut msg =
            VerificationMessage::request(ServiceAddr::parse("10.1.1.1:25565").unwrap(), 42, 90);
        assert!(!msg.is_complete());
        msg.sign_reply(Outpoint::new(TxHash::new([1u8; 32]), 0), &replier.private, &anchor);
        msg.sign_attestation(Outpoint::new(TxHash::new([2u8; 32]), 0), &challenger.private, &anchor);
        (msg, anchor)
    }

    #[test]
    fn completed_exchange_verifies() {
        let (msg, anchor) = exchange();
        assert!(msg.is_complete());
        let replier = keypair_from_seed(&[1u8; 32]).public;
        let challenger = keypair_from_seed(&[2u8; 32]).public;
        assert!(msg.check_signatures(&replier, &challenger, &anchor).is_ok());
    }

    #[test]
    fn wrong_anchor_fails() {
        let (msg, _) = exchange();
        let replier = keypair_from_seed(&[1u8; 32]).public;
        let challenger = keypair_from_seed(&[2u8; 32]).public;
        let err = msg
            .check_signatures(&replier, &challenger, &BlockHash::new([9u8; 32]))
            .unwrap_err();
        assert_eq!(err.misbehavior(), 20);
    }

    #[test]
    fn swapped_outpoints_break_attestation() {
        let (mut msg, anchor) = exchange();
        std::mem::swap(&mut msg.outpoint1, &mut msg.outpoint2);
        let replier = keypair_from_seed(&[1u8; 32]).public;
        let challenger = keypair_from_seed(&[2u8; 32]).public;
        assert!(msg.check_signatures(&replier, &challenger, &anchor).is_err());
    }

    #[test]
    fn hash_excludes_signatures() {
        let (msg, _) = exchange();
        let mut unsigned = msg.clone();
        unsigned.sig1 = None;
        unsigned.sig2 = None;
        assert_eq!(msg.hash(), unsigned.hash());
    }
}
