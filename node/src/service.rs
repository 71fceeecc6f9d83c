//! The operator and peer-facing surface of a safenode-aware node.
//!
//! [`SafenodeService`] ties the registry to its collaborators: it feeds
//! decoded peer messages into the registry, hands relay inventory to the
//! transport after every registry lock is released, and implements one
//! method per operator command.

use std::collections::BTreeMap;
use std::sync::Arc;

use safenode_crypto::{
    generate_keypair, private_key_from_hex, private_key_to_hex, public_from_private,
};
use safenode_election::anchor_height;
use safenode_messages::rejection::MISBEHAVIOR_MINOR;
use safenode_messages::{
    decode_batch_hex, decode_message, encode_batch_hex, BroadcastMessage, CreateContext,
    PingMessage, Rejection, VerificationMessage, WireMessage,
};
use safenode_registry::{Accepted, ChainView, NodeRecord, Outcome, Registry, RegistryUpdate};
use safenode_types::{NodeParams, Outpoint, ServiceAddr};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::commands::{
    AliasResult, ConfEntry, CountMode, CountReport, CreateSummary, DecodeSummary,
    DecodedBroadcast, ListMode, RelayResult, RelaySummary, ScheduledPayee, StartMode,
    StartSummary, WinnerInfo, WinnerTarget,
};
use crate::config::{NodeConfig, NodeEntry};
use crate::contracts::{Clock, Transport, Wallet};
use crate::create::create_from_strings;
use crate::metrics::RegistryMetrics;
use crate::tracing_spans::{command_span, maintenance_span, message_span, start_alias_span};
use crate::NodeError;

/// Depth below the tip of the block a fresh ping commits to, so a short
/// reorg does not invalidate it.
pub const PING_BLOCK_DEPTH: u32 = 12;

pub struct SafenodeService {
    config: NodeConfig,
    params: NodeParams,
    registry: Arc<Registry>,
    chain: Arc<dyn ChainView>,
    transport: Arc<dyn Transport>,
    wallet: Arc<dyn Wallet>,
    clock: Arc<dyn Clock>,
    metrics: RegistryMetrics,
}

impl SafenodeService {
    pub fn new(
        config: NodeConfig,
        chain: Arc<dyn ChainView>,
        transport: Arc<dyn Transport>,
        wallet: Arc<dyn Wallet>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let params = config.effective_params();
        let registry = Arc::new(Registry::new(params.clone()));

        if config.local_node {
            let key = config
                .local_operator_key
                .as_deref()
                .ok_or_else(|| {
                    NodeError::Config("local_node requires local_operator_key".to_string())
                })?;
            let public = public_from_private(&private_key_from_hex(key)?);
            registry.set_local_operator(Some(public));
        }

        Ok(Self {
            config,
            params,
            registry,
            chain,
            transport,
            wallet,
            clock,
            metrics: RegistryMetrics::new(),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Mark the initial list download as finished (or not).
    pub fn set_list_synced(&self, synced: bool) {
        self.registry.set_list_synced(synced);
    }

    // -----------------------------------------------------------------------
    // Peer messages
    // -----------------------------------------------------------------------

    /// Decode and process one message received from a peer.
    pub fn handle_message(&self, bytes: &[u8]) -> Outcome {
        let message = decode_message(bytes).map_err(|e| {
            Rejection::structural(format!("undecodable message: {e}"), MISBEHAVIOR_MINOR)
        })?;
        match message {
            WireMessage::Broadcast(broadcast) => self.handle_broadcast(&broadcast),
            WireMessage::Ping(ping) => self.handle_ping(&ping),
            WireMessage::Verification(verification) => self.handle_verification(&verification),
        }
    }

    pub fn handle_broadcast(&self, broadcast: &BroadcastMessage) -> Outcome {
        let _span = message_span("broadcast").entered();
        let now = self.clock.now();
        let outcome = self
            .registry
            .check_and_merge_broadcast(self.chain.as_ref(), broadcast, now);
        self.record_outcome(
            &outcome,
            &self.metrics.broadcasts_accepted,
            &self.metrics.broadcasts_rejected,
        );
        outcome
    }

    pub fn handle_ping(&self, ping: &PingMessage) -> Outcome {
        let _span = message_span("ping").entered();
        let now = self.clock.now();
        let outcome = self.registry.process_ping(self.chain.as_ref(), ping, now);
        self.record_outcome(
            &outcome,
            &self.metrics.pings_accepted,
            &self.metrics.pings_rejected,
        );
        outcome
    }

    pub fn handle_verification(&self, verification: &VerificationMessage) -> Outcome {
        let _span = message_span("verification").entered();
        let outcome = self
            .registry
            .process_verification(self.chain.as_ref(), verification);
        self.record_outcome(
            &outcome,
            &self.metrics.verifications_accepted,
            &self.metrics.verifications_rejected,
        );
        outcome
    }

    /// Count the outcome and relay whatever it asks for.
    fn record_outcome(
        &self,
        outcome: &Outcome,
        accepted: &prometheus::IntCounter,
        rejected: &prometheus::IntCounter,
    ) {
        match outcome {
            Ok(Accepted::Unchanged) | Ok(Accepted::UnknownNode { .. }) => {}
            Ok(accepted_outcome) => {
                accepted.inc();
                self.relay(accepted_outcome);
            }
            Err(rejection) if rejection.is_stale() => {
                debug!(reason = rejection.reason(), "stale message ignored");
            }
            Err(rejection) => {
                rejected.inc();
                warn!(
                    reason = rejection.reason(),
                    misbehavior = rejection.misbehavior(),
                    "message rejected"
                );
            }
        }
    }

    fn relay(&self, accepted: &Accepted) {
        for inventory in accepted.relay() {
            self.transport.relay(*inventory);
        }
    }

    // -----------------------------------------------------------------------
    // Starting configured nodes
    // -----------------------------------------------------------------------

    fn create_context(&self) -> Result<CreateContext, NodeError> {
        let height = self.chain.tip_height().saturating_sub(PING_BLOCK_DEPTH);
        let tip = self
            .chain
            .block_hash(height)
            .ok_or_else(|| NodeError::Chain(format!("no block at height {height}")))?;
        Ok(CreateContext {
            network: self.params.network,
            protocol_version: self.params.protocol_version,
            tip,
            now: self.clock.now(),
        })
    }

    fn create_entry(&self, entry: &NodeEntry) -> Result<BroadcastMessage, NodeError> {
        let ctx = self.create_context()?;
        create_from_strings(
            &entry.address,
            &entry.operator_key,
            &entry.collateral_txid,
            &entry.collateral_index.to_string(),
            self.wallet.as_ref(),
            &ctx,
        )
    }

    fn entry(&self, alias: &str) -> Result<&NodeEntry, NodeError> {
        self.config
            .find_node(alias)
            .ok_or_else(|| NodeError::UnknownAlias(alias.to_string()))
    }

    fn announce(&self, broadcast: &BroadcastMessage) {
        let accepted = self.registry.merge_broadcast(broadcast);
        if matches!(accepted, Accepted::Added { .. } | Accepted::Updated { .. }) {
            self.metrics.broadcasts_accepted.inc();
        }
        self.relay(&accepted);
    }

    /// Sign an announcement for `alias` without applying it.
    pub fn create_alias(&self, alias: &str) -> Result<BroadcastMessage, NodeError> {
        let _span = command_span("create-alias").entered();
        let entry = self.entry(alias)?;
        self.create_entry(entry)
    }

    /// Sign, apply and relay an announcement for `alias`.
    pub fn start_alias(&self, alias: &str) -> Result<BroadcastMessage, NodeError> {
        let _span = start_alias_span(alias).entered();
        let entry = self.entry(alias)?;
        let broadcast = self.create_entry(entry)?;
        self.announce(&broadcast);
        info!(outpoint = %broadcast.outpoint, addr = %broadcast.addr, "safenode started");
        Ok(broadcast)
    }

    pub fn start_many(&self, mode: StartMode) -> Result<StartSummary, NodeError> {
        let _span = command_span("start-many").entered();
        if mode != StartMode::All && !self.registry.is_list_synced() {
            return Err(NodeError::NotSynced);
        }
        if self.wallet.is_locked() {
            return Err(NodeError::WalletLocked);
        }

        let mut summary = StartSummary::default();
        for entry in &self.config.nodes {
            let known = Outpoint::from_parts(
                &entry.collateral_txid,
                &entry.collateral_index.to_string(),
            )
            .ok()
            .and_then(|outpoint| self.registry.find(&outpoint));
            let skip = match mode {
                StartMode::All => false,
                StartMode::Missing => known.is_some(),
                StartMode::Disabled => known.as_ref().is_some_and(NodeRecord::is_enabled),
            };
            if skip {
                continue;
            }

            let _span = start_alias_span(&entry.alias).entered();
            match self.create_entry(entry) {
                Ok(broadcast) => {
                    self.announce(&broadcast);
                    summary.push(AliasResult::ok(&entry.alias));
                }
                Err(e) => {
                    warn!(alias = %entry.alias, error = %e, "could not start safenode");
                    summary.push(AliasResult::failed(&entry.alias, e));
                }
            }
        }
        info!(
            mode = %mode,
            successful = summary.successful,
            failed = summary.failed,
            "start finished"
        );
        Ok(summary)
    }

    /// Sign announcements for every configured node and return them as a
    /// hex batch.
    pub fn create_all(&self) -> Result<CreateSummary, NodeError> {
        let _span = command_span("create-all").entered();
        if self.wallet.is_locked() {
            return Err(NodeError::WalletLocked);
        }
        let mut summary = StartSummary::default();
        let mut batch = Vec::new();
        for entry in &self.config.nodes {
            match self.create_entry(entry) {
                Ok(broadcast) => {
                    batch.push(broadcast);
                    summary.push(AliasResult::ok(&entry.alias));
                }
                Err(e) => summary.push(AliasResult::failed(&entry.alias, e)),
            }
        }
        Ok(CreateSummary {
            summary,
            hex: encode_batch_hex(&batch),
        })
    }

    /// Decode a hex batch and describe every entry whose signatures hold.
    pub fn decode_batch(&self, hex: &str) -> Result<DecodeSummary, NodeError> {
        decode_batch(hex)
    }

    /// Apply a hex batch. `fast` only checks signatures before merging;
    /// otherwise every entry goes through full peer validation.
    pub fn relay_batch(&self, hex: &str, fast: bool) -> Result<RelaySummary, NodeError> {
        let _span = command_span("relay").entered();
        let batch = decode_batch_hex(hex)?;
        let mut summary = RelaySummary::default();
        for broadcast in &batch {
            let result = if fast {
                broadcast.check_signature().map(|()| self.announce(broadcast))
            } else {
                self.handle_broadcast(broadcast).map(|_| ())
            };
            let outpoint = broadcast.outpoint.to_string();
            match result {
                Ok(()) => {
                    summary.successful += 1;
                    summary.results.push(RelayResult {
                        outpoint,
                        success: true,
                        error: None,
                    });
                }
                Err(rejection) => {
                    summary.failed += 1;
                    summary.results.push(RelayResult {
                        outpoint,
                        success: false,
                        error: Some(rejection.to_string()),
                    });
                }
            }
        }
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// One value per record keyed by outpoint. A non-empty `filter` keeps
    /// entries whose outpoint or rendered value contains it.
    pub fn list(&self, mode: ListMode, filter: &str) -> Result<BTreeMap<String, Value>, NodeError> {
        let mut out = BTreeMap::new();
        if mode == ListMode::Rank {
            let anchor = self.tip_anchor()?;
            for ranked in self.registry.ranks(&anchor) {
                let key = ranked.outpoint.to_string();
                if filter.is_empty() || key.contains(filter) {
                    out.insert(key, Value::from(ranked.rank));
                }
            }
            return Ok(out);
        }

        for record in self.registry.snapshot() {
            let key = record.outpoint.to_string();
            let value = list_value(&record, mode);
            let rendered = match &value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !filter.is_empty() && !key.contains(filter) && !rendered.contains(filter) {
                continue;
            }
            out.insert(key, value);
        }
        Ok(out)
    }

    pub fn count(&self, mode: CountMode) -> Result<CountReport, NodeError> {
        let total = || self.registry.len();
        let mixing = || self.registry.count_enabled(self.params.min_mixing_protocol);
        let enabled = || self.registry.count_enabled(self.params.min_payment_protocol);
        Ok(match mode {
            CountMode::Total => CountReport::Single(total()),
            CountMode::Mixing => CountReport::Single(mixing()),
            CountMode::Enabled => CountReport::Single(enabled()),
            CountMode::Qualify => CountReport::Single(self.qualifying()?),
            CountMode::All => CountReport::All {
                total: total(),
                mixing: mixing(),
                enabled: enabled(),
                qualify: self.qualifying()?,
            },
        })
    }

    fn qualifying(&self) -> Result<usize, NodeError> {
        let height = self.chain.tip_height().saturating_add(1);
        self.registry
            .next_payee(
                self.chain.as_ref(),
                height,
                self.config.watchdog_required,
                true,
                self.clock.now(),
            )
            .map(|s| s.qualifying)
            .ok_or_else(|| NodeError::Chain(format!("no anchor block for height {height}")))
    }

    /// The node elected for the next (or a near future) block. `None` when
    /// nothing qualifies.
    pub fn winner(&self, target: WinnerTarget) -> Result<Option<WinnerInfo>, NodeError> {
        let height = self.chain.tip_height().saturating_add(target.offset());
        let selection = self
            .registry
            .next_payee(
                self.chain.as_ref(),
                height,
                self.config.watchdog_required,
                true,
                self.clock.now(),
            )
            .ok_or_else(|| NodeError::Chain(format!("no anchor block for height {height}")))?;

        let Some(winner) = selection.winner else {
            return Ok(None);
        };
        let Some(record) = self.registry.find(&winner.outpoint) else {
            return Ok(None);
        };
        Ok(Some(WinnerInfo {
            height,
            outpoint: record.outpoint.to_string(),
            addr: record.addr.to_string(),
            payee: record.payee().to_string(),
            protocol: record.protocol_version,
            last_seen: record.last_seen().as_secs(),
            active_seconds: record.active_seconds(),
            qualifying: selection.qualifying,
        }))
    }

    /// Projected payees for `count` heights starting at `from`, assuming
    /// each winner is paid in turn.
    pub fn winners(&self, from: u32, count: u32, filter: &str) -> Vec<ScheduledPayee> {
        self.registry
            .upcoming_winners(
                self.chain.as_ref(),
                from,
                count,
                self.config.watchdog_required,
                self.clock.now(),
            )
            .into_iter()
            .filter_map(|(height, winner)| {
                let record = self.registry.find(&winner.outpoint)?;
                Some(ScheduledPayee {
                    height,
                    outpoint: winner.outpoint.to_string(),
                    payee: record.payee().to_string(),
                })
            })
            .filter(|p| filter.is_empty() || p.outpoint.contains(filter) || p.payee.contains(filter))
            .collect()
    }

    /// Rank of `outpoint` against the current tip's anchor block.
    pub fn rank_of(&self, outpoint: &Outpoint) -> Result<Option<u32>, NodeError> {
        let anchor = self.tip_anchor()?;
        Ok(self.registry.rank_of(outpoint, &anchor))
    }

    fn tip_anchor(&self) -> Result<safenode_types::BlockHash, NodeError> {
        let height = anchor_height(self.chain.tip_height(), self.params.score_anchor_depth);
        self.chain
            .block_hash(height)
            .ok_or_else(|| NodeError::Chain(format!("no block at height {height}")))
    }

    /// A fresh operational private key, hex encoded.
    pub fn genkey() -> String {
        private_key_to_hex(&generate_keypair().private)
    }

    pub fn connect(&self, addr: &str) -> Result<(), NodeError> {
        let addr = ServiceAddr::parse(addr)?;
        if self.transport.connect(addr) {
            Ok(())
        } else {
            Err(NodeError::ConnectFailed(addr.to_string()))
        }
    }

    /// Wallet outputs usable as collateral.
    pub fn outputs(&self) -> Vec<Outpoint> {
        self.wallet.available_collaterals()
    }

    /// Configured nodes with their registry state, or `MISSING`.
    pub fn list_conf(&self) -> Vec<ConfEntry> {
        self.config
            .nodes
            .iter()
            .map(|entry| {
                let status = Outpoint::from_parts(
                    &entry.collateral_txid,
                    &entry.collateral_index.to_string(),
                )
                .ok()
                .and_then(|outpoint| self.registry.find(&outpoint))
                .map_or_else(|| "MISSING".to_string(), |r| r.state().to_string());
                ConfEntry {
                    alias: entry.alias.clone(),
                    address: entry.address.clone(),
                    operator_key: entry.operator_key.clone(),
                    collateral_txid: entry.collateral_txid.clone(),
                    collateral_index: entry.collateral_index,
                    status,
                }
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// One pass over the registry: re-check every record, drop spent
    /// collateral, refresh payments and publish the accumulated changes.
    pub fn run_maintenance(&self) -> RegistryUpdate {
        let chain = self.chain.as_ref();
        let _span = maintenance_span(chain.tip_height()).entered();
        let now = self.clock.now();

        self.registry.check_all(chain, now);
        self.registry.remove_spent(chain, now);
        self.registry
            .update_last_paid(chain, self.config.payment_scan_back);
        let update = self.registry.notify_dependents();

        self.metrics.nodes_total.set(update.total as i64);
        self.metrics.nodes_enabled.set(update.enabled as i64);
        debug!(
            total = update.total,
            enabled = update.enabled,
            removed = update.removed.len(),
            dirty_governance = update.dirty_governance.len(),
            "maintenance pass finished"
        );
        update
    }
}

/// Decode a hex batch without a running registry. Entries whose
/// signatures fail are counted, not described.
pub fn decode_batch(hex: &str) -> Result<DecodeSummary, NodeError> {
    let batch = decode_batch_hex(hex)?;
    let mut summary = DecodeSummary::default();
    for broadcast in batch {
        if broadcast.check_signature().is_err() {
            summary.failed += 1;
            continue;
        }
        summary.entries.push(DecodedBroadcast {
            outpoint: broadcast.outpoint.to_string(),
            addr: broadcast.addr.to_string(),
            collateral_key: hex::encode(broadcast.collateral_key.as_bytes()),
            operator_key: hex::encode(broadcast.operator_key.as_bytes()),
            sig_time: broadcast.sig_time.as_secs(),
            protocol_version: broadcast.protocol_version,
            ping_sig_time: broadcast.ping.sig_time.as_secs(),
            ping_block_hash: broadcast.ping.block_hash.to_string(),
            hash: broadcast.hash().to_string(),
        });
    }
    Ok(summary)
}

fn list_value(record: &NodeRecord, mode: ListMode) -> Value {
    match mode {
        ListMode::ActiveSeconds => Value::from(record.active_seconds()),
        ListMode::Addr => Value::from(record.addr.to_string()),
        ListMode::Full => Value::from(format!(
            "{:>18} {} {} {} {:>8} {:>10} {:>6} {}",
            record.state().as_str(),
            record.protocol_version,
            record.payee(),
            record.last_seen().as_secs(),
            record.active_seconds(),
            record.last_paid_time.as_secs(),
            record.last_paid_height,
            record.addr,
        )),
        ListMode::LastSeen => Value::from(record.last_seen().as_secs()),
        ListMode::LastPaidTime => Value::from(record.last_paid_time.as_secs()),
        ListMode::LastPaidBlock => Value::from(record.last_paid_height),
        ListMode::Protocol => Value::from(record.protocol_version),
        ListMode::Payee => Value::from(record.payee().to_string()),
        ListMode::Status => Value::from(record.state().as_str()),
        // Ranks need the whole registry; `list` handles them separately.
        ListMode::Rank => Value::Null,
    }
}
