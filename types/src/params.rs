//! Network parameters for the safenode registry.
//!
//! Timing windows and thresholds every node must agree on. Divergent values
//! split the payment queue, so nodes on the same network load identical
//! parameters.

use crate::amount::Amount;
use crate::network::NetworkId;
use serde::{Deserialize, Serialize};

/// Minimum interval between two full lifecycle checks of one record.
pub const CHECK_SECONDS: u64 = 5;
/// Minimum interval between two applied announcements of one record.
pub const MIN_BROADCAST_SECONDS: u64 = 5 * 60;
/// Ping cadence. A ping closer than this to the announcement keeps the
/// record pre-enabled.
pub const MIN_PING_SECONDS: u64 = 10 * 60;
/// A record without a ping in this window is expired.
pub const EXPIRATION_SECONDS: u64 = 65 * 60;
/// Maximum age of the last watchdog vote while the watchdog is active.
pub const WATCHDOG_MAX_SECONDS: u64 = 120 * 60;
/// A record silent this long needs a new announcement.
pub const NEW_START_REQUIRED_SECONDS: u64 = 180 * 60;
/// Bound of the proof-of-service score. Fixed; not a tunable.
pub const POSE_BAN_MAX_SCORE: i32 = 5;
/// How far in the future a signing time may lie.
pub const MAX_FUTURE_DRIFT_SECONDS: u64 = 60 * 60;
/// Pings must reference a block at most this deep below the tip.
pub const PING_MAX_BLOCK_AGE: u32 = 24;
/// Verification anchors must be at most this deep below the tip.
pub const VERIFICATION_MAX_BLOCK_AGE: u32 = 10;
/// Confirmations the collateral needs before it can back an announcement.
pub const COLLATERAL_MIN_CONFIRMATIONS: u32 = 15;
/// Payment scores for height `h` are seeded by the block at `h - depth`.
pub const SCORE_ANCHOR_DEPTH: u32 = 101;

/// All registry parameters stored by every node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeParams {
    /// Network the parameters belong to.
    pub network: NetworkId,
    /// Exact value a collateral output must carry.
    pub collateral_amount: Amount,
    /// Announcements below this protocol version are malformed.
    pub protocol_floor: u32,
    /// Records below this protocol version are `UpdateRequired`
    /// and excluded from payment.
    pub min_payment_protocol: u32,
    /// Minimum protocol version for mixing service.
    pub min_mixing_protocol: u32,
    /// Current protocol version of this implementation.
    pub protocol_version: u32,

    pub check_seconds: u64,
    pub min_broadcast_seconds: u64,
    pub min_ping_seconds: u64,
    pub expiration_seconds: u64,
    pub watchdog_max_seconds: u64,
    pub new_start_required_seconds: u64,
    pub max_future_drift_seconds: u64,

    pub ping_max_block_age: u32,
    pub verification_max_block_age: u32,
    pub collateral_min_confirmations: u32,
    pub score_anchor_depth: u32,
}

impl NodeParams {
    /// Protocol version spoken by this implementation.
    pub const PROTOCOL_VERSION: u32 = 70206;

    /// Live network defaults.
    pub fn live() -> Self {
        Self {
            network: NetworkId::Live,
            collateral_amount: Amount::from_coins(1000),
            protocol_floor: 70200,
            min_payment_protocol: 70206,
            min_mixing_protocol: 70206,
            protocol_version: Self::PROTOCOL_VERSION,

            check_seconds: CHECK_SECONDS,
            min_broadcast_seconds: MIN_BROADCAST_SECONDS,
            min_ping_seconds: MIN_PING_SECONDS,
            expiration_seconds: EXPIRATION_SECONDS,
            watchdog_max_seconds: WATCHDOG_MAX_SECONDS,
            new_start_required_seconds: NEW_START_REQUIRED_SECONDS,
            max_future_drift_seconds: MAX_FUTURE_DRIFT_SECONDS,

            ping_max_block_age: PING_MAX_BLOCK_AGE,
            verification_max_block_age: VERIFICATION_MAX_BLOCK_AGE,
            collateral_min_confirmations: COLLATERAL_MIN_CONFIRMATIONS,
            score_anchor_depth: SCORE_ANCHOR_DEPTH,
        }
    }

    /// Defaults for `network`. Only the network tag and the confirmation
    /// depth differ from live; timing windows are consensus-relevant and
    /// stay identical.
    pub fn for_network(network: NetworkId) -> Self {
        let mut params = Self::live();
        params.network = network;
        if network == NetworkId::Dev {
            params.collateral_min_confirmations = 1;
        }
        params
    }
}

impl Default for NodeParams {
    fn default() -> Self {
        Self::for_network(NetworkId::Dev)
    }
}
