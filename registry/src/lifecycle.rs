//! Lifecycle state derivation.
//!
//! A record's state is never set directly after construction. [`NodeRecord::check`]
//! re-derives it from timers and external facts, most severe condition first:
//!
//! 1. collateral spent (terminal)
//! 2. PoSe ban, entered at the score bound and lifted at the ban height
//! 3. protocol too old
//! 4. waiting for the first pings while the list is still syncing
//! 5. silent long enough to need a new announcement
//! 6. watchdog vote too old while the watchdog is active
//! 7. ping expired
//! 8. announcement younger than one ping interval
//! 9. enabled

use safenode_types::params::POSE_BAN_MAX_SCORE;
use safenode_types::{NodeParams, NodeState, Timestamp};

use crate::record::NodeRecord;

/// External facts a lifecycle check is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct CheckContext<'a> {
    pub now: Timestamp,
    /// Current chain tip height.
    pub height: u32,
    pub collateral_spent: bool,
    /// Records below this protocol version need an update.
    pub min_protocol: u32,
    /// Watchdog votes have been seen recently on the network.
    pub watchdog_active: bool,
    /// The registry has finished its initial sync.
    pub list_synced: bool,
    /// The record belongs to this process's own node.
    pub is_local: bool,
    /// Number of records; a new PoSe ban lasts this many blocks.
    pub registry_size: u32,
    pub params: &'a NodeParams,
}

impl NodeRecord {
    /// Re-derive the lifecycle state and return it.
    ///
    /// Unless `force` is set, a record checked less than `check_seconds`
    /// ago is left alone.
    pub fn check(&mut self, ctx: &CheckContext<'_>, force: bool) -> NodeState {
        let params = ctx.params;
        if !force
            && self.time_last_checked != Timestamp::EPOCH
            && self.time_last_checked.is_within(params.check_seconds, ctx.now)
        {
            return self.state;
        }
        self.time_last_checked = ctx.now;

        if self.state == NodeState::OutpointSpent {
            return self.state;
        }
        if ctx.collateral_spent {
            return self.transition(NodeState::OutpointSpent);
        }

        if self.state == NodeState::PoseBan {
            if ctx.height < self.pose_ban_height {
                return self.state;
            }
            // Ban served: one step back from the bound, then evaluate normally.
            self.decrease_pose_ban_score();
            tracing::info!(
                outpoint = %self.outpoint,
                score = self.pose_score,
                "PoSe ban lifted"
            );
        } else if self.pose_score >= POSE_BAN_MAX_SCORE {
            self.pose_ban_height = ctx.height.saturating_add(ctx.registry_size);
            tracing::warn!(
                outpoint = %self.outpoint,
                until = self.pose_ban_height,
                "PoSe banned"
            );
            return self.transition(NodeState::PoseBan);
        }

        if self.protocol_version < ctx.min_protocol {
            return self.transition(NodeState::UpdateRequired);
        }

        let wait_for_ping =
            !ctx.list_synced && !self.is_pinged_within(params.min_ping_seconds, ctx.now);

        if wait_for_ping && !ctx.is_local {
            // Pings may not have arrived yet while the list syncs.
            if matches!(
                self.state,
                NodeState::Expired | NodeState::WatchdogExpired | NodeState::NewStartRequired
            ) {
                return self.state;
            }
        }

        if !wait_for_ping || ctx.is_local {
            if !self.is_pinged_within(params.new_start_required_seconds, ctx.now) {
                return self.transition(NodeState::NewStartRequired);
            }
            let watchdog_expired = ctx.watchdog_active
                && self.last_watchdog_vote.elapsed_since(ctx.now) > params.watchdog_max_seconds;
            if watchdog_expired {
                return self.transition(NodeState::WatchdogExpired);
            }
            if !self.is_pinged_within(params.expiration_seconds, ctx.now) {
                return self.transition(NodeState::Expired);
            }
        }

        let pinged_since_announce = self.last_ping.as_ref().map(|p| {
            p.sig_time.as_secs() as i64 - self.sig_time.as_secs() as i64
        });
        match pinged_since_announce {
            Some(age) if age >= params.min_ping_seconds as i64 => {
                self.transition(NodeState::Enabled)
            }
            _ => self.transition(NodeState::PreEnabled),
        }
    }

    fn transition(&mut self, next: NodeState) -> NodeState {
        if self.state != next {
            tracing::debug!(
                outpoint = %self.outpoint,
                from = %self.state,
                to = %next,
                "state changed"
            );
            self.state = next;
        }
        next
    }
}
