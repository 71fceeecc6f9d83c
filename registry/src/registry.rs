//! The concurrent safenode registry.
//!
//! Records live in a keyed map behind a registry-wide `RwLock`, each record
//! behind its own `Mutex`. Lock order is always registry first, then
//! record. Readers receive owned clones. Inventory to relay is collected
//! under lock and returned to the caller; no transport call happens here.

use parking_lot::{Mutex, RwLock};
use safenode_election::{
    anchor_height, rank, select_payee, upcoming_winners, Candidate, ElectionParams, RankedNode,
    Selection, Winner,
};
use safenode_messages::rejection::{MISBEHAVIOR_FORGED, MISBEHAVIOR_MISMATCH};
use safenode_messages::{BroadcastMessage, PingMessage, Rejection, VerificationMessage};
use safenode_types::{
    BlockHash, NodeParams, NodeState, Outpoint, PublicKey, Timestamp,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::chain::ChainView;
use crate::collateral::check_outpoint;
use crate::dedup::SeenMessages;
use crate::governance::GovernanceHash;
use crate::lifecycle::CheckContext;
use crate::outcome::{Accepted, Outcome, RegistryUpdate};
use crate::record::NodeRecord;

type Entry = Arc<Mutex<NodeRecord>>;

#[derive(Default)]
struct RegistryInner {
    records: HashMap<Outpoint, Entry>,
    seen_broadcasts: SeenMessages,
    seen_pings: SeenMessages,
    seen_verifications: SeenMessages,
    dirty_governance: Vec<GovernanceHash>,
    added: bool,
    removed: Vec<Outpoint>,
    mixing_queue_count: u64,
    last_watchdog_vote: Timestamp,
    local_operator: Option<PublicKey>,
    list_synced: bool,
}

impl RegistryInner {
    fn entry(&self, outpoint: &Outpoint) -> Option<Entry> {
        self.records.get(outpoint).cloned()
    }

    fn sorted_entries(&self) -> Vec<(Outpoint, Entry)> {
        let mut entries: Vec<_> = self
            .records
            .iter()
            .map(|(o, e)| (*o, Arc::clone(e)))
            .collect();
        entries.sort_by_key(|(o, _)| *o);
        entries
    }

    fn watchdog_active(&self, now: Timestamp, params: &NodeParams) -> bool {
        self.last_watchdog_vote != Timestamp::EPOCH
            && self
                .last_watchdog_vote
                .is_within(params.watchdog_max_seconds, now)
    }

    fn count_enabled(&self, min_protocol: u32) -> usize {
        self.records
            .values()
            .filter(|e| {
                let r = e.lock();
                r.is_enabled() && r.protocol_version >= min_protocol
            })
            .count()
    }
}

pub struct Registry {
    params: NodeParams,
    inner: RwLock<RegistryInner>,
}

impl Registry {
    pub fn new(params: NodeParams) -> Self {
        Self {
            params,
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    pub fn params(&self) -> &NodeParams {
        &self.params
    }

    /// Operational key of this process's own node, if it runs one.
    pub fn set_local_operator(&self, key: Option<PublicKey>) {
        self.inner.write().local_operator = key;
    }

    pub fn set_list_synced(&self, synced: bool) {
        self.inner.write().list_synced = synced;
    }

    pub fn is_list_synced(&self) -> bool {
        self.inner.read().list_synced
    }

    fn context<'a>(
        &'a self,
        inner: &RegistryInner,
        record: &NodeRecord,
        chain: &dyn ChainView,
        now: Timestamp,
    ) -> CheckContext<'a> {
        CheckContext {
            now,
            height: chain.tip_height(),
            collateral_spent: chain
                .collateral(&record.outpoint)
                .map_or(true, |c| c.spent),
            min_protocol: self.params.min_payment_protocol,
            watchdog_active: inner.watchdog_active(now, &self.params),
            list_synced: inner.list_synced,
            is_local: inner.local_operator == Some(record.operator_key),
            registry_size: inner.records.len() as u32,
            params: &self.params,
        }
    }

    /// A ping's block must be known and recent.
    fn check_ping_block(&self, chain: &dyn ChainView, ping: &PingMessage) -> Result<(), Rejection> {
        let Some(height) = chain.block_height(&ping.block_hash) else {
            return Err(Rejection::stale(format!(
                "ping for {} references unknown block {}",
                ping.outpoint, ping.block_hash
            )));
        };
        let tip = chain.tip_height();
        if height.saturating_add(self.params.ping_max_block_age) < tip {
            return Err(Rejection::stale(format!(
                "ping for {} references block {height}, tip is {tip}",
                ping.outpoint
            )));
        }
        Ok(())
    }

    /// Whether a ping must be refused given the record's current ping.
    fn check_ping_order(&self, record: &NodeRecord, ping: &PingMessage) -> Result<(), Rejection> {
        if let Some(current) = &record.last_ping {
            if ping.sig_time < current.sig_time {
                return Err(Rejection::stale(format!(
                    "ping for {} older than the current one",
                    ping.outpoint
                )));
            }
        }
        let too_early = self.params.min_ping_seconds.saturating_sub(60);
        if record.is_pinged_within(too_early, ping.sig_time) {
            return Err(Rejection::stale(format!(
                "ping for {} arrived too early",
                ping.outpoint
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn find(&self, outpoint: &Outpoint) -> Option<NodeRecord> {
        let inner = self.inner.read();
        let entry = inner.entry(outpoint)?;
        let record = entry.lock().clone();
        Some(record)
    }

    /// Clones of every record, ordered by outpoint.
    pub fn snapshot(&self) -> Vec<NodeRecord> {
        let inner = self.inner.read();
        inner
            .sorted_entries()
            .into_iter()
            .map(|(_, e)| e.lock().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Enabled records at or above `min_protocol`.
    pub fn count_enabled(&self, min_protocol: u32) -> usize {
        self.inner.read().count_enabled(min_protocol)
    }

    /// Records at or above `min_protocol`, regardless of state.
    pub fn count_at_protocol(&self, min_protocol: u32) -> usize {
        let inner = self.inner.read();
        inner
            .records
            .values()
            .filter(|e| e.lock().protocol_version >= min_protocol)
            .count()
    }

    fn candidates(&self) -> Vec<Candidate> {
        let inner = self.inner.read();
        inner
            .sorted_entries()
            .into_iter()
            .map(|(_, e)| e.lock().candidate())
            .collect()
    }

    /// Every record ordered by ascending score against `block_hash`.
    pub fn ranks(&self, block_hash: &BlockHash) -> Vec<RankedNode> {
        let outpoints: Vec<Outpoint> = {
            let inner = self.inner.read();
            inner.records.keys().copied().collect()
        };
        rank(&outpoints, block_hash)
    }

    pub fn rank_of(&self, outpoint: &Outpoint, block_hash: &BlockHash) -> Option<u32> {
        self.ranks(block_hash)
            .into_iter()
            .find(|r| r.outpoint == *outpoint)
            .map(|r| r.rank)
    }

    fn election_params(
        &self,
        chain: &dyn ChainView,
        watchdog_required: bool,
        filter_sig_time: bool,
        now: Timestamp,
    ) -> ElectionParams {
        ElectionParams {
            min_payment_protocol: self.params.min_payment_protocol,
            watchdog_required,
            filter_sig_time,
            now,
            tip_height: chain.tip_height(),
        }
    }

    /// Elect the payee for `target_height`. `None` when the anchor block is
    /// unknown.
    pub fn next_payee(
        &self,
        chain: &dyn ChainView,
        target_height: u32,
        watchdog_required: bool,
        filter_sig_time: bool,
        now: Timestamp,
    ) -> Option<Selection> {
        let anchor = chain.block_hash(anchor_height(target_height, self.params.score_anchor_depth))?;
        let params = self.election_params(chain, watchdog_required, filter_sig_time, now);
        let selection = select_payee(&self.candidates(), &anchor, &params);
        tracing::debug!(
            height = target_height,
            winner = ?selection.winner.map(|w| w.outpoint),
            qualifying = selection.qualifying,
            "payee elected"
        );
        Some(selection)
    }

    /// Simulated winners for `count` heights starting at `from`.
    pub fn upcoming_winners(
        &self,
        chain: &dyn ChainView,
        from: u32,
        count: u32,
        watchdog_required: bool,
        now: Timestamp,
    ) -> Vec<(u32, Winner)> {
        let params = self.election_params(chain, watchdog_required, true, now);
        let depth = self.params.score_anchor_depth;
        upcoming_winners(
            &self.candidates(),
            from,
            count,
            |h| chain.block_hash(anchor_height(h, depth)),
            &params,
        )
    }

    /// Records that may still be challenged: those not yet verified down to
    /// the lower PoSe bound.
    pub fn challenge_candidates(&self) -> Vec<NodeRecord> {
        self.snapshot()
            .into_iter()
            .filter(|r| !r.is_pose_verified())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Announcements
    // -----------------------------------------------------------------------

    /// Insert or update from a locally created announcement without
    /// validation.
    pub fn merge_broadcast(&self, broadcast: &BroadcastMessage) -> Accepted {
        let mut inner = self.inner.write();
        inner.seen_broadcasts.insert(broadcast.hash());
        inner.seen_pings.insert(broadcast.ping.hash());
        let relay = vec![broadcast.inventory()];

        let existing = inner.entry(&broadcast.outpoint);
        match existing {
            Some(entry) => {
                let mut record = entry.lock();
                if !record.update_from_broadcast(broadcast, true) {
                    return Accepted::Unchanged;
                }
                let dirty = record.flag_governance_items_dirty();
                inner.dirty_governance.extend(dirty);
                tracing::info!(outpoint = %broadcast.outpoint, "local safenode updated");
                Accepted::Updated { relay }
            }
            None => {
                let record = NodeRecord::from_broadcast(broadcast, true);
                inner
                    .records
                    .insert(broadcast.outpoint, Arc::new(Mutex::new(record)));
                inner.added = true;
                tracing::info!(outpoint = %broadcast.outpoint, "local safenode added");
                Accepted::Added { relay }
            }
        }
    }

    /// Validate an announcement received from a peer and merge it.
    pub fn check_and_merge_broadcast(
        &self,
        chain: &dyn ChainView,
        broadcast: &BroadcastMessage,
        now: Timestamp,
    ) -> Outcome {
        let outcome = self.merge_remote_broadcast(chain, broadcast, now);
        match &outcome {
            Ok(accepted) => tracing::debug!(
                outpoint = %broadcast.outpoint,
                result = ?accepted,
                "broadcast processed"
            ),
            Err(rejection) => tracing::debug!(
                outpoint = %broadcast.outpoint,
                misbehavior = rejection.misbehavior(),
                "broadcast rejected: {rejection}"
            ),
        }
        outcome
    }

    fn merge_remote_broadcast(
        &self,
        chain: &dyn ChainView,
        broadcast: &BroadcastMessage,
        now: Timestamp,
    ) -> Outcome {
        let mut inner = self.inner.write();
        let hash = broadcast.hash();
        if inner.seen_broadcasts.contains(&hash) {
            return Ok(Accepted::Unchanged);
        }

        let ping_ok = broadcast.simple_check(now, &self.params)?;
        let ping_usable = ping_ok && self.check_ping_block(chain, &broadcast.ping).is_ok();

        let existing = inner.entry(&broadcast.outpoint);
        if let Some(entry) = existing {
            let mut record = entry.lock();
            if broadcast.sig_time == record.sig_time {
                return Err(Rejection::stale("announcement already known"));
            }
            if broadcast.sig_time < record.sig_time {
                return Err(Rejection::stale(format!(
                    "announcement signed at {} older than {}",
                    broadcast.sig_time, record.sig_time
                )));
            }
            let ctx = self.context(&inner, &record, chain, now);
            record.check(&ctx, false);
            if record.is_pose_banned() {
                return Err(Rejection::stale(format!(
                    "{} is PoSe banned",
                    broadcast.outpoint
                )));
            }
            if record.collateral_key != broadcast.collateral_key {
                return Err(Rejection::cryptographic(
                    format!("collateral key mismatch for {}", broadcast.outpoint),
                    MISBEHAVIOR_MISMATCH,
                ));
            }
            broadcast.check_signature()?;

            let is_local = inner.local_operator == Some(broadcast.operator_key);
            if record.is_broadcasted_within(self.params.min_broadcast_seconds, now) && !is_local {
                drop(record);
                inner.seen_broadcasts.insert(hash);
                return Ok(Accepted::Unchanged);
            }

            let ping_usable =
                ping_usable && self.check_ping_order(&record, &broadcast.ping).is_ok();
            record.update_from_broadcast(broadcast, ping_usable);
            let dirty = record.flag_governance_items_dirty();
            let ctx = self.context(&inner, &record, chain, now);
            record.check(&ctx, true);
            drop(record);

            inner.dirty_governance.extend(dirty);
            inner.seen_broadcasts.insert(hash);
            if ping_usable {
                inner.seen_pings.insert(broadcast.ping.hash());
            }
            tracing::info!(outpoint = %broadcast.outpoint, "safenode updated");
            return Ok(Accepted::Updated {
                relay: vec![broadcast.inventory()],
            });
        }

        broadcast.check_signature()?;
        let collateral_height = check_outpoint(chain, broadcast, &self.params)?;

        let mut record = NodeRecord::from_broadcast(broadcast, ping_usable);
        record.collateral_height = Some(collateral_height);
        inner
            .records
            .insert(broadcast.outpoint, Arc::new(Mutex::new(record)));
        inner.added = true;
        inner.seen_broadcasts.insert(hash);
        if ping_usable {
            inner.seen_pings.insert(broadcast.ping.hash());
        }
        tracing::info!(
            outpoint = %broadcast.outpoint,
            addr = %broadcast.addr,
            "safenode added"
        );
        Ok(Accepted::Added {
            relay: vec![broadcast.inventory()],
        })
    }

    // -----------------------------------------------------------------------
    // Pings
    // -----------------------------------------------------------------------

    pub fn process_ping(&self, chain: &dyn ChainView, ping: &PingMessage, now: Timestamp) -> Outcome {
        let mut inner = self.inner.write();
        let hash = ping.hash();
        if inner.seen_pings.contains(&hash) {
            return Ok(Accepted::Unchanged);
        }

        ping.simple_check(now, self.params.max_future_drift_seconds)?;
        self.check_ping_block(chain, ping)?;

        let Some(entry) = inner.entry(&ping.outpoint) else {
            tracing::debug!(outpoint = %ping.outpoint, "ping for unknown safenode");
            return Ok(Accepted::UnknownNode {
                outpoint: ping.outpoint,
            });
        };

        let mut record = entry.lock();
        if matches!(
            record.state(),
            NodeState::UpdateRequired | NodeState::NewStartRequired
        ) {
            return Err(Rejection::stale(format!(
                "{} is {} and needs a new announcement",
                ping.outpoint,
                record.state()
            )));
        }
        self.check_ping_order(&record, ping)?;
        ping.check_signature(&record.operator_key)?;

        record.last_ping = Some(ping.clone());
        let ctx = self.context(&inner, &record, chain, now);
        let state = record.check(&ctx, true);
        drop(record);
        inner.seen_pings.insert(hash);

        let relay = if matches!(
            state,
            NodeState::Enabled | NodeState::Expired | NodeState::WatchdogExpired
        ) {
            vec![ping.inventory()]
        } else {
            Vec::new()
        };
        tracing::trace!(outpoint = %ping.outpoint, %state, "ping accepted");
        Ok(Accepted::Updated { relay })
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Apply a completed address verification.
    ///
    /// On success the replying node moves one step towards verified and
    /// every other record claiming the same address one step towards a ban.
    pub fn process_verification(
        &self,
        chain: &dyn ChainView,
        message: &VerificationMessage,
    ) -> Outcome {
        let mut inner = self.inner.write();
        let hash = message.hash();
        if inner.seen_verifications.contains(&hash) {
            return Ok(Accepted::Unchanged);
        }

        let tip = chain.tip_height();
        if message
            .height
            .saturating_add(self.params.verification_max_block_age)
            < tip
        {
            return Err(Rejection::stale(format!(
                "verification anchored at {} too old for tip {tip}",
                message.height
            )));
        }
        if message.outpoint1 == message.outpoint2 {
            return Err(Rejection::structural(
                "verification names the same node twice",
                MISBEHAVIOR_FORGED,
            ));
        }
        let Some(anchor) = chain.block_hash(message.height) else {
            return Err(Rejection::stale(format!(
                "unknown verification anchor {}",
                message.height
            )));
        };
        let (Some(replier), Some(challenger)) = (
            inner.entry(&message.outpoint1),
            inner.entry(&message.outpoint2),
        ) else {
            return Err(Rejection::stale("verification names an unknown node"));
        };

        let (replier_addr, replier_key) = {
            let r = replier.lock();
            (r.addr, r.operator_key)
        };
        let challenger_key = challenger.lock().operator_key;
        if replier_addr != message.addr {
            return Err(Rejection::stale(format!(
                "{} no longer announces {}",
                message.outpoint1, message.addr
            )));
        }
        message.check_signatures(&replier_key, &challenger_key, &anchor)?;

        {
            let mut r = replier.lock();
            if !r.is_pose_verified() {
                r.decrease_pose_ban_score();
            }
        }
        for (outpoint, entry) in inner.records.iter() {
            if *outpoint == message.outpoint1 {
                continue;
            }
            let mut r = entry.lock();
            if r.addr == message.addr {
                r.increase_pose_ban_score();
                tracing::warn!(
                    outpoint = %outpoint,
                    addr = %message.addr,
                    score = r.pose_score(),
                    "address spoofing detected"
                );
            }
        }
        inner.seen_verifications.insert(hash);

        Ok(Accepted::Updated {
            relay: vec![message.inventory()],
        })
    }

    /// Penalise a node that failed to answer a challenge.
    pub fn increase_pose_ban_score(&self, outpoint: &Outpoint) -> bool {
        let inner = self.inner.read();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        entry.lock().increase_pose_ban_score();
        true
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Re-derive every record's state, honouring the per-record throttle.
    pub fn check_all(&self, chain: &dyn ChainView, now: Timestamp) {
        let inner = self.inner.read();
        for (_, entry) in inner.sorted_entries() {
            let mut record = entry.lock();
            if record.collateral_height.is_none() {
                record.collateral_height = chain.collateral(&record.outpoint).map(|c| c.height);
            }
            let ctx = self.context(&inner, &record, chain, now);
            record.check(&ctx, false);
        }
    }

    /// Drop records whose collateral is spent. Their governance votes are
    /// flagged dirty.
    pub fn remove_spent(&self, chain: &dyn ChainView, now: Timestamp) -> Vec<Outpoint> {
        let mut inner = self.inner.write();
        let mut spent = Vec::new();
        for (outpoint, entry) in inner.sorted_entries() {
            let mut record = entry.lock();
            let ctx = self.context(&inner, &record, chain, now);
            if record.check(&ctx, false) == NodeState::OutpointSpent {
                spent.push((outpoint, record.flag_governance_items_dirty()));
            }
        }

        let mut removed = Vec::with_capacity(spent.len());
        for (outpoint, dirty) in spent {
            inner.records.remove(&outpoint);
            inner.dirty_governance.extend(dirty);
            inner.removed.push(outpoint);
            tracing::info!(outpoint = %outpoint, "safenode removed, collateral spent");
            removed.push(outpoint);
        }
        removed
    }

    /// Refresh last-paid bookkeeping from the chain.
    pub fn update_last_paid(&self, chain: &dyn ChainView, scan_back: u32) {
        let tip = chain.tip_height();
        let inner = self.inner.read();
        for entry in inner.records.values() {
            let mut record = entry.lock();
            let Some(height) = chain.last_payment(&record.payee(), tip, scan_back) else {
                continue;
            };
            if height > record.last_paid_height {
                let time = chain.block_time(height).unwrap_or(Timestamp::EPOCH);
                record.update_last_paid(height, time);
            }
        }
    }

    /// Summarise and reset the changes dependents have not seen yet.
    pub fn notify_dependents(&self) -> RegistryUpdate {
        let mut inner = self.inner.write();
        let enabled = inner.count_enabled(self.params.min_payment_protocol);
        RegistryUpdate {
            added: std::mem::take(&mut inner.added),
            removed: std::mem::take(&mut inner.removed),
            dirty_governance: std::mem::take(&mut inner.dirty_governance),
            total: inner.records.len(),
            enabled,
        }
    }

    // -----------------------------------------------------------------------
    // Governance and watchdog votes
    // -----------------------------------------------------------------------

    pub fn add_governance_vote(&self, outpoint: &Outpoint, object: GovernanceHash) -> bool {
        let inner = self.inner.read();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        entry.lock().add_governance_vote(object);
        true
    }

    pub fn remove_governance_object(&self, object: &GovernanceHash) {
        let inner = self.inner.read();
        for entry in inner.records.values() {
            entry.lock().remove_governance_object(object);
        }
    }

    /// Drain the object hashes flagged since the last call.
    pub fn take_dirty_governance_objects(&self) -> Vec<GovernanceHash> {
        std::mem::take(&mut self.inner.write().dirty_governance)
    }

    pub fn add_watchdog_vote(&self, outpoint: &Outpoint, now: Timestamp) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        entry.lock().update_watchdog_vote(now);
        inner.last_watchdog_vote = now;
        true
    }

    pub fn is_watchdog_active(&self, now: Timestamp) -> bool {
        self.inner.read().watchdog_active(now, &self.params)
    }

    // -----------------------------------------------------------------------
    // Mixing queue
    // -----------------------------------------------------------------------

    /// Stamp a node's mixing-queue entry and bump the global counter.
    pub fn allow_mixing(&self, outpoint: &Outpoint) -> bool {
        let mut inner = self.inner.write();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        inner.mixing_queue_count += 1;
        let mut record = entry.lock();
        record.last_mixing_queue = inner.mixing_queue_count;
        record.allow_mixing = true;
        true
    }

    pub fn disallow_mixing(&self, outpoint: &Outpoint) -> bool {
        let inner = self.inner.read();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        entry.lock().allow_mixing = false;
        true
    }

    /// A node may queue again once a fifth of the enabled mixing nodes have
    /// queued since its last entry.
    pub fn is_mixing_queue_eligible(&self, outpoint: &Outpoint) -> bool {
        let inner = self.inner.read();
        let Some(entry) = inner.entry(outpoint) else {
            return false;
        };
        let last = entry.lock().last_mixing_queue;
        let window = (inner.count_enabled(self.params.min_mixing_protocol) / 5) as u64;
        last == 0 || last.saturating_add(window) <= inner.mixing_queue_count
    }

    pub fn mixing_queue_count(&self) -> u64 {
        self.inner.read().mixing_queue_count
    }
}
