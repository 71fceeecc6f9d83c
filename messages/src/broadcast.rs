//! Full node announcements signed by the collateral key.

use safenode_crypto::{
    blake2b_256_multi, is_valid_public_key, public_from_private, sign_message, verify_signature,
};
use safenode_types::{
    BlockHash, KeyPair, NetworkId, NodeParams, Outpoint, PublicKey, ServiceAddr, Signature,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::canonical;
use crate::inventory::{Inventory, InventoryKind, MessageHash};
use crate::ping::PingMessage;
use crate::rejection::{Rejection, MISBEHAVIOR_FORGED, MISBEHAVIOR_MINOR};

const BROADCAST_DOMAIN: &[u8] = b"safenode-broadcast";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreateError {
    #[error("invalid service address {0} for this network")]
    InvalidAddress(String),

    #[error("invalid {0} key")]
    InvalidKey(&'static str),

    #[error("signature did not verify after signing")]
    SigningFailed,
}

/// Chain and protocol facts a new announcement is built against.
#[derive(Clone, Copy, Debug)]
pub struct CreateContext {
    pub network: NetworkId,
    pub protocol_version: u32,
    pub tip: BlockHash,
    pub now: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub outpoint: Outpoint,
    pub addr: ServiceAddr,
    pub collateral_key: PublicKey,
    pub operator_key: PublicKey,
    pub signature: Signature,
    pub sig_time: Timestamp,
    pub protocol_version: u32,
    pub ping: PingMessage,
}

impl BroadcastMessage {
    /// Build a signed announcement plus its embedded ping.
    ///
    /// The ping is signed with the operational key first, then the
    /// broadcast with the collateral key. Both signatures are verified
    /// before the message is returned.
    pub fn create(
        outpoint: Outpoint,
        addr: ServiceAddr,
        collateral: &KeyPair,
        operator: &KeyPair,
        ctx: &CreateContext,
    ) -> Result<Self, CreateError> {
        if !addr.is_valid_for(ctx.network) {
            return Err(CreateError::InvalidAddress(addr.to_string()));
        }
        check_keypair(collateral, "collateral")?;
        check_keypair(operator, "operational")?;

        let ping = PingMessage::new_signed(outpoint, ctx.tip, ctx.now, &operator.private);
        let mut broadcast = Self {
            outpoint,
            addr,
            collateral_key: collateral.public,
            operator_key: operator.public,
            signature: Signature([0u8; 64]),
            sig_time: ctx.now,
            protocol_version: ctx.protocol_version,
            ping,
        };
        broadcast.signature = sign_message(&broadcast.signing_bytes(), &collateral.private);

        if broadcast.check_signature().is_err() {
            return Err(CreateError::SigningFailed);
        }
        Ok(broadcast)
    }

    /// Bytes covered by the collateral signature: every field except the
    /// signature itself and the embedded ping.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut bytes = BROADCAST_DOMAIN.to_vec();
        bytes.extend(canonical(&(
            self.outpoint,
            self.addr,
            self.collateral_key,
            self.operator_key,
            self.sig_time,
            self.protocol_version,
        )));
        bytes
    }

    /// H(outpoint ‖ collateral key ‖ signing time).
    pub fn hash(&self) -> MessageHash {
        MessageHash(blake2b_256_multi(&[
            &canonical(&self.outpoint),
            self.collateral_key.as_bytes(),
            &canonical(&self.sig_time),
        ]))
    }

    pub fn inventory(&self) -> Inventory {
        Inventory::new(InventoryKind::Broadcast, self.hash())
    }

    /// Structural validation, independent of any registry state.
    ///
    /// On success returns whether the embedded ping is itself usable; a
    /// record created from a broadcast with an unusable ping starts
    /// `Expired` instead of `PreEnabled`.
    pub fn simple_check(&self, now: Timestamp, params: &NodeParams) -> Result<bool, Rejection> {
        if !self.addr.is_valid_for(params.network) {
            return Err(Rejection::structural(
                format!("invalid address {} for {}", self.addr, self.outpoint),
                MISBEHAVIOR_MINOR,
            ));
        }
        if self.sig_time > now.saturating_add(params.max_future_drift_seconds) {
            return Err(Rejection::structural(
                format!("broadcast for {} signed too far in the future", self.outpoint),
                MISBEHAVIOR_MINOR,
            ));
        }
        if self.protocol_version < params.protocol_floor {
            return Err(Rejection::structural(
                format!(
                    "protocol {} below floor {} for {}",
                    self.protocol_version, params.protocol_floor, self.outpoint
                ),
                MISBEHAVIOR_MINOR,
            ));
        }

        let ping_ok = self.ping.outpoint == self.outpoint
            && self
                .ping
                .simple_check(now, params.max_future_drift_seconds)
                .is_ok();
        Ok(ping_ok)
    }

    /// Verify both keys, the collateral signature and the embedded ping's
    /// operational signature.
    pub fn check_signature(&self) -> Result<(), Rejection> {
        if !is_valid_public_key(&self.collateral_key) {
            return Err(Rejection::cryptographic(
                format!("invalid collateral key for {}", self.outpoint),
                MISBEHAVIOR_FORGED,
            ));
        }
        if !is_valid_public_key(&self.operator_key) {
            return Err(Rejection::cryptographic(
                format!("invalid operational key for {}", self.outpoint),
                MISBEHAVIOR_FORGED,
            ));
        }
        if !verify_signature(&self.signing_bytes(), &self.signature, &self.collateral_key) {
            return Err(Rejection::cryptographic(
                format!("bad broadcast signature for {}", self.outpoint),
                MISBEHAVIOR_FORGED,
            ));
        }
        self.ping.check_signature(&self.operator_key)
    }
}

fn check_keypair(pair: &KeyPair, which: &'static str) -> Result<(), CreateError> {
    if !is_valid_public_key(&pair.public) || public_from_private(&pair.private) != pair.public {
        return Err(CreateError::InvalidKey(which));
    }
    Ok(())
}
