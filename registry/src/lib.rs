//! Safenode registry.
//!
//! Holds one [`NodeRecord`] per collateral outpoint, derives lifecycle
//! states, applies announcements, pings and verifications received from
//! peers, and exposes the snapshots the payment election runs on.

pub mod chain;
pub mod collateral;
pub mod dedup;
pub mod governance;
pub mod lifecycle;
pub mod outcome;
pub mod record;
pub mod registry;

pub use chain::{ChainView, CollateralInfo};
pub use collateral::check_outpoint;
pub use dedup::{SeenMessages, DEFAULT_SEEN_CAPACITY};
pub use governance::{GovernanceHash, GovernanceVotes};
pub use lifecycle::CheckContext;
pub use outcome::{Accepted, Outcome, RegistryUpdate};
pub use record::NodeRecord;
pub use registry::Registry;
