//! Read-only view of the blockchain the registry runs on.

use safenode_crypto::PayeeId;
use safenode_types::{Amount, BlockHash, Outpoint, PublicKey, Timestamp};

/// Facts about a collateral output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollateralInfo {
    pub value: Amount,
    /// Height of the block that mined the output.
    pub height: u32,
    /// Key that can spend the output.
    pub owner: PublicKey,
    pub spent: bool,
}

impl CollateralInfo {
    /// Confirmations at `tip`, counting the mining block.
    pub fn confirmations(&self, tip: u32) -> u32 {
        if self.height > tip {
            0
        } else {
            (tip - self.height).saturating_add(1)
        }
    }
}

/// Chain queries consumed by the registry.
///
/// Implementations must be cheap and synchronous; the registry may call them
/// while holding its own locks.
pub trait ChainView: Send + Sync {
    fn tip_height(&self) -> u32;

    fn block_hash(&self, height: u32) -> Option<BlockHash>;

    fn block_height(&self, hash: &BlockHash) -> Option<u32>;

    fn block_time(&self, height: u32) -> Option<Timestamp>;

    fn collateral(&self, outpoint: &Outpoint) -> Option<CollateralInfo>;

    /// Height of the most recent block at or below `tip`, looking back at
    /// most `scan_back` blocks, that paid `payee`.
    fn last_payment(&self, payee: &PayeeId, tip: u32, scan_back: u32) -> Option<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(height: u32) -> CollateralInfo {
        CollateralInfo {
            value: Amount::from_coins(1000),
            height,
            owner: PublicKey([1; 32]),
            spent: false,
        }
    }

    #[test]
    fn confirmations_count_the_mining_block() {
        assert_eq!(info(100).confirmations(100), 1);
        assert_eq!(info(100).confirmations(114), 15);
        assert_eq!(info(100).confirmations(99), 0);
        assert_eq!(info(0).confirmations(u32::MAX), u32::MAX);
    }
}
