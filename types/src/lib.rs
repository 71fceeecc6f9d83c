//! Fundamental types for the safenode registry.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! collateral outpoints, block hashes, keys, service addresses, timestamps,
//! lifecycle states and the tunable network parameters.

pub mod address;
pub mod amount;
pub mod block;
pub mod error;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod state;
pub mod time;

pub use address::ServiceAddr;
pub use amount::Amount;
pub use block::BlockHash;
pub use error::SafenodeError;
pub use hash::{Outpoint, TxHash};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use params::NodeParams;
pub use state::NodeState;
pub use time::Timestamp;
