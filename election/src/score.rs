//! Per-block scores and informational ranking.

use safenode_crypto::blake2b_256_multi;
use safenode_types::{BlockHash, Outpoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 256-bit score, ordered as a big-endian unsigned integer.
///
/// The derived `Ord` on the byte array is lexicographic, which is exactly
/// big-endian numeric order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Score(pub [u8; 32]);

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Score = Blake2b-256(txid ‖ index LE ‖ block hash).
pub fn score(outpoint: &Outpoint, block_hash: &BlockHash) -> Score {
    Score(blake2b_256_multi(&[
        outpoint.txid.as_bytes(),
        &outpoint.index.to_le_bytes(),
        block_hash.as_bytes(),
    ]))
}

/// Height of the block whose hash seeds the scores for `target`.
pub fn anchor_height(target: u32, depth: u32) -> u32 {
    target.saturating_sub(depth)
}

/// A record's position in the score ordering for one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedNode {
    /// 1-based; rank 1 holds the smallest score.
    pub rank: u32,
    pub outpoint: Outpoint,
    pub score: Score,
}

/// Order outpoints by ascending score against `block_hash`.
pub fn rank<'a>(
    outpoints: impl IntoIterator<Item = &'a Outpoint>,
    block_hash: &BlockHash,
) -> Vec<RankedNode> {
    let mut scored: Vec<(Score, Outpoint)> = outpoints
        .into_iter()
        .map(|o| (score(o, block_hash), *o))
        .collect();
    scored.sort();
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, outpoint))| RankedNode {
            rank: i as u32 + 1,
            outpoint,
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use safenode_types::TxHash;

    fn op(b: u8) -> Outpoint {
        Outpoint::new(TxHash::new([b; 32]), 0)
    }

    #[test]
    fn score_depends_on_block_and_outpoint() {
        let h1 = BlockHash::new([1u8; 32]);
        let h2 = BlockHash::new([2u8; 32]);
        assert_ne!(score(&op(1), &h1), score(&op(1), &h2));
        assert_ne!(score(&op(1), &h1), score(&op(2), &h1));
        assert_eq!(score(&op(1), &h1), score(&op(1), &h1));
    }

    #[test]
    fn score_orders_big_endian() {
        let mut low = [0u8; 32];
        low[31] = 9;
        let mut high = [0u8; 32];
        high[0] = 1;
        assert!(Score(low) < Score(high));
    }

    #[test]
    fn ranks_are_dense_and_ascending() {
        let ops: Vec<_> = (1..=5).map(op).collect();
        let ranked = rank(&ops, &BlockHash::new([7u8; 32]));
        assert_eq!(ranked.len(), 5);
        for (i, r) in ranked.iter().enumerate() {
            assert_eq!(r.rank, i as u32 + 1);
        }
        assert!(ranked.windows(2).all(|w| w[0].score < w[1].score));
    }

    #[test]
    fn anchor_clamps_at_genesis() {
        assert_eq!(anchor_height(1_000, 101), 899);
        assert_eq!(anchor_height(50, 101), 0);
    }
}
