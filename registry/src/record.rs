//! The per-outpoint registry entry.

use safenode_crypto::PayeeId;
use safenode_election::Candidate;
use safenode_messages::{BroadcastMessage, PingMessage};
use safenode_types::params::POSE_BAN_MAX_SCORE;
use safenode_types::{NodeState, Outpoint, PublicKey, ServiceAddr, Signature, Timestamp};

use crate::governance::{GovernanceHash, GovernanceVotes};

/// Everything the registry knows about one safenode.
///
/// Lifecycle state, PoSe score and the check throttle are private: the
/// state only changes through [`NodeRecord::check`] and the score only
/// moves one step at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRecord {
    pub outpoint: Outpoint,
    pub addr: ServiceAddr,
    pub collateral_key: PublicKey,
    pub operator_key: PublicKey,
    pub last_ping: Option<PingMessage>,
    pub signature: Signature,
    pub sig_time: Timestamp,
    pub protocol_version: u32,
    pub last_paid_time: Timestamp,
    pub last_paid_height: u32,
    /// Height of the block that mined the collateral, once looked up.
    pub collateral_height: Option<u32>,
    /// Mixing-queue counter value when this node last queued.
    pub last_mixing_queue: u64,
    pub allow_mixing: bool,
    pub last_watchdog_vote: Timestamp,
    pub(crate) state: NodeState,
    pub(crate) pose_score: i32,
    pub(crate) pose_ban_height: u32,
    pub(crate) time_last_checked: Timestamp,
    governance: GovernanceVotes,
}

impl NodeRecord {
    /// Build a record from an accepted broadcast.
    ///
    /// `ping_usable` is the outcome of the embedded ping's own checks. A
    /// record without a usable ping starts `Expired`.
    pub fn from_broadcast(broadcast: &BroadcastMessage, ping_usable: bool) -> Self {
        let (state, last_ping) = if ping_usable {
            (NodeState::PreEnabled, Some(broadcast.ping.clone()))
        } else {
            (NodeState::Expired, None)
        };
        Self {
            outpoint: broadcast.outpoint,
            addr: broadcast.addr,
            collateral_key: broadcast.collateral_key,
            operator_key: broadcast.operator_key,
            last_ping,
            signature: broadcast.signature,
            sig_time: broadcast.sig_time,
            protocol_version: broadcast.protocol_version,
            last_paid_time: Timestamp::EPOCH,
            last_paid_height: 0,
            collateral_height: None,
            last_mixing_queue: 0,
            allow_mixing: true,
            last_watchdog_vote: broadcast.sig_time,
            state,
            pose_score: 0,
            pose_ban_height: 0,
            time_last_checked: Timestamp::EPOCH,
            governance: GovernanceVotes::default(),
        }
    }

    /// Rebuild the announcement this record was last updated from.
    pub fn to_broadcast(&self) -> Option<BroadcastMessage> {
        Some(BroadcastMessage {
            outpoint: self.outpoint,
            addr: self.addr,
            collateral_key: self.collateral_key,
            operator_key: self.operator_key,
            signature: self.signature,
            sig_time: self.sig_time,
            protocol_version: self.protocol_version,
            ping: self.last_ping.clone()?,
        })
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn pose_score(&self) -> i32 {
        self.pose_score
    }

    pub fn pose_ban_height(&self) -> u32 {
        self.pose_ban_height
    }

    pub fn payee(&self) -> PayeeId {
        PayeeId::from_public_key(&self.collateral_key)
    }

    /// Seconds between the announcement and the latest ping.
    pub fn active_seconds(&self) -> u64 {
        self.last_ping
            .as_ref()
            .map_or(0, |p| p.sig_time.as_secs().saturating_sub(self.sig_time.as_secs()))
    }

    pub fn last_seen(&self) -> Timestamp {
        self.last_ping.as_ref().map_or(Timestamp::EPOCH, |p| p.sig_time)
    }

    /// Whether the latest ping was signed less than `secs` before `at`.
    /// A ping signed after `at` counts as within.
    pub fn is_pinged_within(&self, secs: u64, at: Timestamp) -> bool {
        self.last_ping
            .as_ref()
            .is_some_and(|p| p.sig_time.is_within(secs, at))
    }

    pub fn is_broadcasted_within(&self, secs: u64, at: Timestamp) -> bool {
        self.sig_time.is_within(secs, at)
    }

    pub fn is_enabled(&self) -> bool {
        self.state == NodeState::Enabled
    }

    pub fn is_pose_banned(&self) -> bool {
        self.state == NodeState::PoseBan
    }

    /// Verified nodes are exempt from further address challenges.
    pub fn is_pose_verified(&self) -> bool {
        self.pose_score <= -POSE_BAN_MAX_SCORE
    }

    /// `Enabled`, or `WatchdogExpired` when watchdog votes are not required.
    pub fn is_valid_for_payment(&self, watchdog_required: bool) -> bool {
        self.candidate().is_payable(watchdog_required)
    }

    pub fn increase_pose_ban_score(&mut self) {
        if self.pose_score < POSE_BAN_MAX_SCORE {
            self.pose_score += 1;
        }
    }

    pub fn decrease_pose_ban_score(&mut self) {
        if self.pose_score > -POSE_BAN_MAX_SCORE {
            self.pose_score -= 1;
        }
    }

    /// Apply a strictly newer announcement.
    ///
    /// Resets PoSe and the check throttle; adopts the embedded ping only
    /// when `ping_usable`. Returns `false` and changes nothing when the
    /// announcement is not newer than the current one.
    pub fn update_from_broadcast(&mut self, broadcast: &BroadcastMessage, ping_usable: bool) -> bool {
        if broadcast.sig_time <= self.sig_time {
            return false;
        }
        self.operator_key = broadcast.operator_key;
        self.sig_time = broadcast.sig_time;
        self.signature = broadcast.signature;
        self.protocol_version = broadcast.protocol_version;
        self.addr = broadcast.addr;
        self.pose_score = 0;
        self.pose_ban_height = 0;
        self.time_last_checked = Timestamp::EPOCH;
        if ping_usable {
            self.last_ping = Some(broadcast.ping.clone());
        }
        true
    }

    pub fn update_last_paid(&mut self, height: u32, time: Timestamp) {
        self.last_paid_height = height;
        self.last_paid_time = time;
    }

    pub fn update_watchdog_vote(&mut self, now: Timestamp) {
        self.last_watchdog_vote = now;
    }

    pub fn add_governance_vote(&mut self, object: GovernanceHash) {
        self.governance.add_vote(object);
    }

    pub fn remove_governance_object(&mut self, object: &GovernanceHash) -> bool {
        self.governance.remove_object(object)
    }

    /// Hashes of every object this record voted on, for recomputation.
    pub fn flag_governance_items_dirty(&self) -> Vec<GovernanceHash> {
        self.governance.objects()
    }

    pub fn governance(&self) -> &GovernanceVotes {
        &self.governance
    }

    /// The view of this record the election works with.
    pub fn candidate(&self) -> Candidate {
        Candidate {
            outpoint: self.outpoint,
            state: self.state,
            protocol_version: self.protocol_version,
            sig_time: self.sig_time,
            last_paid_height: self.last_paid_height,
            collateral_height: self.collateral_height,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::broadcast;
    use super::*;

    #[test]
    fn usable_ping_starts_pre_enabled() {
        let record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        assert_eq!(record.state(), NodeState::PreEnabled);
        assert!(record.last_ping.is_some());
        assert_eq!(record.last_watchdog_vote, Timestamp::new(1_000));
    }

    #[test]
    fn unusable_ping_starts_expired() {
        let record = NodeRecord::from_broadcast(&broadcast(1, 1_000), false);
        assert_eq!(record.state(), NodeState::Expired);
        assert!(record.last_ping.is_none());
        assert!(record.to_broadcast().is_none());
    }

    #[test]
    fn pose_score_is_clamped() {
        let mut record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        for _ in 0..20 {
            record.increase_pose_ban_score();
        }
        assert_eq!(record.pose_score(), 5);
        for _ in 0..20 {
            record.decrease_pose_ban_score();
        }
        assert_eq!(record.pose_score(), -5);
        assert!(record.is_pose_verified());
    }

    #[test]
    fn only_newer_broadcasts_update() {
        let mut record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        record.increase_pose_ban_score();
        assert!(!record.update_from_broadcast(&broadcast(1, 1_000), true));
        assert!(!record.update_from_broadcast(&broadcast(1, 900), true));
        assert_eq!(record.pose_score(), 1);

        assert!(record.update_from_broadcast(&broadcast(1, 2_000), true));
        assert_eq!(record.sig_time, Timestamp::new(2_000));
        assert_eq!(record.pose_score(), 0);
        assert_eq!(record.last_ping.as_ref().unwrap().sig_time, Timestamp::new(2_000));
    }

    #[test]
    fn update_keeps_old_ping_when_new_one_is_unusable() {
        let mut record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        assert!(record.update_from_broadcast(&broadcast(1, 2_000), false));
        assert_eq!(record.last_ping.as_ref().unwrap().sig_time, Timestamp::new(1_000));
    }

    #[test]
    fn pinged_within_counts_future_pings() {
        let record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        assert!(record.is_pinged_within(600, Timestamp::new(1_599)));
        assert!(!record.is_pinged_within(600, Timestamp::new(1_600)));
        assert!(record.is_pinged_within(600, Timestamp::new(300)));
    }

    #[test]
    fn broadcasted_within_counts_future_announcements() {
        let record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        assert!(record.is_broadcasted_within(300, Timestamp::new(1_299)));
        assert!(!record.is_broadcasted_within(300, Timestamp::new(1_300)));
        assert!(record.is_broadcasted_within(300, Timestamp::new(100)));
    }

    #[test]
    fn governance_flags_every_object() {
        let mut record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        record.add_governance_vote(GovernanceHash([3u8; 32]));
        record.add_governance_vote(GovernanceHash([4u8; 32]));
        assert_eq!(record.flag_governance_items_dirty().len(), 2);
        assert!(record.remove_governance_object(&GovernanceHash([3u8; 32])));
        assert_eq!(record.flag_governance_items_dirty(), vec![GovernanceHash([4u8; 32])]);
    }

    #[test]
    fn active_seconds_tracks_latest_ping() {
        let mut record = NodeRecord::from_broadcast(&broadcast(1, 1_000), true);
        assert_eq!(record.active_seconds(), 0);
        let mut ping = record.last_ping.clone().unwrap();
        ping.sig_time = Timestamp::new(1_750);
        record.last_ping = Some(ping);
        assert_eq!(record.active_seconds(), 750);
        assert_eq!(record.last_seen(), Timestamp::new(1_750));
    }
}
