//! Nullable wallet: collateral keys derived from fixed seeds.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use safenode_crypto::keypair_from_seed;
use safenode_node::Wallet;
use safenode_types::{KeyPair, Outpoint, PublicKey};

#[derive(Default)]
pub struct NullWallet {
    locked: AtomicBool,
    seeds: Mutex<BTreeMap<Outpoint, [u8; 32]>>,
}

impl NullWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the collateral at `outpoint`, owned by the key derived from
    /// `seed`. Returns the owning public key.
    pub fn add_collateral(&self, outpoint: Outpoint, seed: [u8; 32]) -> PublicKey {
        self.seeds.lock().insert(outpoint, seed);
        keypair_from_seed(&seed).public
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }
}

impl Wallet for NullWallet {
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    fn collateral_keys(&self, outpoint: &Outpoint) -> Option<KeyPair> {
        self.seeds.lock().get(outpoint).map(keypair_from_seed)
    }

    fn available_collaterals(&self) -> Vec<Outpoint> {
        self.seeds.lock().keys().copied().collect()
    }
}
