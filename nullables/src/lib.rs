//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the registry and node consume (clock, chain,
//! transport, wallet) is abstracted behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod clock;
pub mod transport;
pub mod wallet;

pub use chain::NullChain;
pub use clock::NullClock;
pub use transport::NullTransport;
pub use wallet::NullWallet;
