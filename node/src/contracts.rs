//! Collaborators the node consumes but does not implement.
//!
//! Production wires these to the P2P layer, the wallet and the system
//! clock; tests use the doubles in `safenode-nullables`.

use safenode_messages::Inventory;
use safenode_types::{KeyPair, Outpoint, ServiceAddr, Timestamp};

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Peer-to-peer dissemination.
pub trait Transport: Send + Sync {
    /// Announce an inventory item to peers.
    fn relay(&self, inventory: Inventory);

    /// Open a connection to `addr`. Returns `false` on failure.
    fn connect(&self, addr: ServiceAddr) -> bool;
}

/// Access to collateral keys.
pub trait Wallet: Send + Sync {
    fn is_locked(&self) -> bool;

    /// Key pair owning the collateral at `outpoint`, if this wallet holds it.
    fn collateral_keys(&self, outpoint: &Outpoint) -> Option<KeyPair>;

    /// Unspent outputs of exactly the collateral amount.
    fn available_collaterals(&self) -> Vec<Outpoint>;
}
