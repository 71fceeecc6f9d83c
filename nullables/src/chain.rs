//! Nullable chain: a scripted block index and UTXO view.

use std::collections::HashMap;

use parking_lot::RwLock;
use safenode_crypto::{blake2b_256, PayeeId};
use safenode_registry::{ChainView, CollateralInfo};
use safenode_types::{Amount, BlockHash, Outpoint, PublicKey, Timestamp};

/// Time of block 0.
pub const GENESIS_TIME: u64 = 1_600_000_000;
/// Seconds between consecutive blocks.
pub const BLOCK_SPACING: u64 = 150;

#[derive(Default)]
struct ChainState {
    tip: u32,
    collaterals: HashMap<Outpoint, CollateralInfo>,
    payments: HashMap<PayeeId, Vec<u32>>,
}

/// A chain whose blocks are derived from their height.
///
/// Block `h` has hash `blake2b(h)` and time `GENESIS_TIME + h * BLOCK_SPACING`.
/// Heights above the tip are unknown.
pub struct NullChain {
    state: RwLock<ChainState>,
}

impl NullChain {
    pub fn new(tip: u32) -> Self {
        Self {
            state: RwLock::new(ChainState {
                tip,
                ..ChainState::default()
            }),
        }
    }

    /// Hash of block `height`, whether or not it is mined yet.
    pub fn hash_at(height: u32) -> BlockHash {
        BlockHash::new(blake2b_256(&height.to_le_bytes()))
    }

    pub fn time_at(height: u32) -> Timestamp {
        Timestamp::new(GENESIS_TIME + u64::from(height) * BLOCK_SPACING)
    }

    pub fn set_tip(&self, tip: u32) {
        self.state.write().tip = tip;
    }

    pub fn advance(&self, blocks: u32) {
        self.state.write().tip += blocks;
    }

    /// Register an unspent collateral output mined at `height`.
    pub fn add_collateral(&self, outpoint: Outpoint, owner: PublicKey, value: Amount, height: u32) {
        self.state.write().collaterals.insert(
            outpoint,
            CollateralInfo {
                value,
                height,
                owner,
                spent: false,
            },
        );
    }

    pub fn spend(&self, outpoint: &Outpoint) {
        if let Some(info) = self.state.write().collaterals.get_mut(outpoint) {
            info.spent = true;
        }
    }

    /// Record that the block at `height` paid `payee`.
    pub fn add_payment(&self, payee: PayeeId, height: u32) {
        self.state.write().payments.entry(payee).or_default().push(height);
    }
}

impl ChainView for NullChain {
    fn tip_height(&self) -> u32 {
        self.state.read().tip
    }

    fn block_hash(&self, height: u32) -> Option<BlockHash> {
        (height <= self.tip_height()).then(|| Self::hash_at(height))
    }

    fn block_height(&self, hash: &BlockHash) -> Option<u32> {
        (0..=self.tip_height()).rev().find(|h| Self::hash_at(*h) == *hash)
    }

    fn block_time(&self, height: u32) -> Option<Timestamp> {
        (height <= self.tip_height()).then(|| Self::time_at(height))
    }

    fn collateral(&self, outpoint: &Outpoint) -> Option<CollateralInfo> {
        self.state.read().collaterals.get(outpoint).copied()
    }

    fn last_payment(&self, payee: &PayeeId, tip: u32, scan_back: u32) -> Option<u32> {
        let lowest = tip.saturating_sub(scan_back);
        self.state
            .read()
            .payments
            .get(payee)?
            .iter()
            .copied()
            .filter(|h| (lowest..=tip).contains(h))
            .max()
    }
}
