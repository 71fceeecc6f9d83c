//! Lifecycle states of a registered safenode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a safenode record.
///
/// The state is derived by `NodeRecord::check`; it is never assigned directly
/// outside of record construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Announced, but no ping separated from the announcement yet.
    PreEnabled,
    /// Pinging regularly; eligible for service and payment.
    Enabled,
    /// Last ping is older than the expiration window.
    Expired,
    /// The collateral output has been spent. Terminal.
    OutpointSpent,
    /// Announced protocol version is below the network minimum.
    UpdateRequired,
    /// No watchdog vote within its window.
    WatchdogExpired,
    /// Silent for so long that a fresh announcement is required.
    NewStartRequired,
    /// Banned by proof-of-service scoring.
    PoseBan,
}

impl NodeState {
    /// All states in declaration order.
    pub const ALL: [NodeState; 8] = [
        Self::PreEnabled,
        Self::Enabled,
        Self::Expired,
        Self::OutpointSpent,
        Self::UpdateRequired,
        Self::WatchdogExpired,
        Self::NewStartRequired,
        Self::PoseBan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreEnabled => "PRE_ENABLED",
            Self::Enabled => "ENABLED",
            Self::Expired => "EXPIRED",
            Self::OutpointSpent => "OUTPOINT_SPENT",
            Self::UpdateRequired => "UPDATE_REQUIRED",
            Self::WatchdogExpired => "WATCHDOG_EXPIRED",
            Self::NewStartRequired => "NEW_START_REQUIRED",
            Self::PoseBan => "POSE_BAN",
        }
    }

    /// States from which an operator may restart the node with its existing
    /// announcement data.
    pub fn is_valid_for_auto_start(&self) -> bool {
        matches!(
            self,
            Self::Enabled | Self::PreEnabled | Self::Expired | Self::WatchdogExpired
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
