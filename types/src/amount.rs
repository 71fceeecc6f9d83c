//! Coin amounts, used to check the collateral value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of base units in one coin.
pub const COIN: u64 = 100_000_000;

/// An amount in base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Whole coins.
    pub fn from_coins(coins: u64) -> Self {
        Self(coins.saturating_mul(COIN))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / COIN, self.0 % COIN)
    }
}
