//! Transaction hashes and collateral outpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SafenodeError;

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, SafenodeError> {
        hex::decode_32(s)
            .map(Self)
            .ok_or_else(|| SafenodeError::InvalidOutpoint(format!("bad transaction hash: {s}")))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Reference to the collateral output that backs a safenode.
///
/// The outpoint is the registry key: at most one live record exists per outpoint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: TxHash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: TxHash, index: u32) -> Self {
        Self { txid, index }
    }

    /// Build an outpoint from the hex txid and decimal index strings found in
    /// node configuration entries.
    pub fn from_parts(txid: &str, index: &str) -> Result<Self, SafenodeError> {
        let txid = TxHash::from_hex(txid)?;
        let index = index
            .trim()
            .parse::<u32>()
            .map_err(|_| SafenodeError::InvalidOutpoint(format!("bad output index: {index}")))?;
        Ok(Self { txid, index })
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({}-{})", hex::encode(&self.txid.0[..4]), self.index)
    }
}

/// Short form `txid-index`, used as the key in listings.
impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.txid, self.index)
    }
}

impl FromStr for Outpoint {
    type Err = SafenodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .rsplit_once('-')
            .ok_or_else(|| SafenodeError::InvalidOutpoint(s.to_string()))?;
        Self::from_parts(txid, index)
    }
}

// Inline hex helpers to avoid adding the `hex` crate as a dependency of types.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode_32(s: &str) -> Option<[u8; 32]> {
        let s = s.trim();
        if s.len() != 64 || !s.is_ascii() {
            return None;
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outpoint_display_parses_back() {
        let op = Outpoint::new(TxHash::new([0xab; 32]), 7);
        let parsed: Outpoint = op.to_string().parse().unwrap();
        assert_eq!(parsed, op);
    }

    #[test]
    fn from_parts_rejects_short_txid() {
        assert!(Outpoint::from_parts("abcd", "0").is_err());
    }

    #[test]
    fn from_parts_rejects_bad_index() {
        let txid = "11".repeat(32);
        assert!(Outpoint::from_parts(&txid, "x").is_err());
        assert!(Outpoint::from_parts(&txid, "-1").is_err());
    }

    #[test]
    fn outpoints_order_by_txid_then_index() {
        let a = Outpoint::new(TxHash::new([1; 32]), 5);
        let b = Outpoint::new(TxHash::new([1; 32]), 6);
        let c = Outpoint::new(TxHash::new([2; 32]), 0);
        assert!(a < b && b < c);
    }
}
