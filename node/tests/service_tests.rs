//! End-to-end tests of the node command surface over nullable
//! collaborators.

use std::sync::Arc;
use std::time::Duration;

use safenode_crypto::{keypair_from_seed, private_key_from_hex, private_key_to_hex};
use safenode_messages::{encode_batch_hex, encode_message, PingMessage, WireMessage};
use safenode_node::{
    Clock, CountMode, CountReport, ListMode, NodeConfig, NodeEntry, NodeError, SafenodeService,
    StartMode, WinnerTarget,
};
use safenode_nullables::{NullChain, NullClock, NullTransport, NullWallet};
use safenode_registry::Accepted;
use safenode_types::{Amount, NodeState, Outpoint, Timestamp, TxHash};

// ---- Helpers ----

const TIP: u32 = 200;

struct Fixture {
    chain: Arc<NullChain>,
    transport: Arc<NullTransport>,
    wallet: Arc<NullWallet>,
    clock: Arc<NullClock>,
    service: SafenodeService,
}

fn outpoint(seed: u8) -> Outpoint {
    Outpoint::new(TxHash::new([seed; 32]), 0)
}

fn operator_seed(seed: u8) -> [u8; 32] {
    [seed.wrapping_add(128); 32]
}

fn entry(seed: u8) -> NodeEntry {
    NodeEntry {
        alias: format!("mn{seed}"),
        address: format!("10.0.0.{seed}:25565"),
        operator_key: private_key_to_hex(&keypair_from_seed(&operator_seed(seed)).private),
        collateral_txid: hex::encode([seed; 32]),
        collateral_index: 0,
    }
}

fn config(seeds: &[u8]) -> NodeConfig {
    NodeConfig {
        nodes: seeds.iter().copied().map(entry).collect(),
        ..NodeConfig::default()
    }
}

fn fixture(seeds: &[u8]) -> Fixture {
    fixture_with(config(seeds), seeds)
}

/// Every seed gets a funded collateral the wallet can sign for.
fn fixture_with(config: NodeConfig, seeds: &[u8]) -> Fixture {
    let chain = Arc::new(NullChain::new(TIP));
    let transport = Arc::new(NullTransport::new());
    let wallet = Arc::new(NullWallet::new());
    let clock = Arc::new(NullClock::new(NullChain::time_at(TIP).as_secs()));
    for &seed in seeds {
        let owner = wallet.add_collateral(outpoint(seed), [seed; 32]);
        chain.add_collateral(outpoint(seed), owner, Amount::from_coins(1000), 100);
    }
    let service = SafenodeService::new(
        config,
        chain.clone(),
        transport.clone(),
        wallet.clone(),
        clock.clone(),
    )
    .unwrap();
    Fixture {
        chain,
        transport,
        wallet,
        clock,
        service,
    }
}

fn ping(seed: u8, sig_time: Timestamp) -> PingMessage {
    PingMessage::new_signed(
        outpoint(seed),
        NullChain::hash_at(TIP - 1),
        sig_time,
        &keypair_from_seed(&operator_seed(seed)).private,
    )
}

/// Start every seed, then ping each one enough later to enable it.
fn start_and_enable(f: &Fixture, seeds: &[u8]) {
    for seed in seeds {
        f.service.start_alias(&format!("mn{seed}")).unwrap();
    }
    f.clock.advance(700);
    for &seed in seeds {
        f.service.handle_ping(&ping(seed, f.clock.now())).unwrap();
    }
}

// ---- Starting nodes ----

#[test]
fn start_alias_adds_record_and_relays() {
    let f = fixture(&[1]);
    let broadcast = f.service.start_alias("mn1").unwrap();

    let record = f.service.registry().find(&outpoint(1)).unwrap();
    assert_eq!(record.state(), NodeState::PreEnabled);
    assert_eq!(f.transport.relayed(), vec![broadcast.inventory()]);
    assert_eq!(f.service.metrics().broadcasts_accepted.get(), 1);
}

#[test]
fn repeated_start_counts_one_accepted_broadcast() {
    let f = fixture(&[1]);
    f.service.start_alias("mn1").unwrap();
    f.service.start_alias("mn1").unwrap();
    assert_eq!(f.service.metrics().broadcasts_accepted.get(), 1);
    assert_eq!(f.transport.relayed().len(), 1);
}

#[test]
fn unknown_alias_is_an_error() {
    let f = fixture(&[1]);
    assert!(matches!(
        f.service.start_alias("nope"),
        Err(NodeError::UnknownAlias(_))
    ));
}

#[test]
fn locked_wallet_refuses_to_start() {
    let f = fixture(&[1]);
    f.wallet.lock();
    assert!(matches!(
        f.service.start_alias("mn1"),
        Err(NodeError::WalletLocked)
    ));
    assert!(matches!(
        f.service.start_many(StartMode::All),
        Err(NodeError::WalletLocked)
    ));
    f.wallet.unlock();
    assert!(f.service.start_alias("mn1").is_ok());
}

#[test]
fn start_missing_requires_synced_list() {
    let f = fixture(&[1, 2]);
    assert!(matches!(
        f.service.start_many(StartMode::Missing),
        Err(NodeError::NotSynced)
    ));

    f.service.start_alias("mn1").unwrap();
    f.service.set_list_synced(true);
    let summary = f.service.start_many(StartMode::Missing).unwrap();
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.results[0].alias, "mn2");
}

#[test]
fn start_disabled_skips_enabled_nodes() {
    let f = fixture(&[1, 2]);
    start_and_enable(&f, &[1]);
    f.service.set_list_synced(true);

    let summary = f.service.start_many(StartMode::Disabled).unwrap();
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.results[0].alias, "mn2");
}

#[test]
fn start_all_reports_each_alias() {
    let mut config = config(&[1, 2]);
    config.nodes.push(NodeEntry {
        alias: "broken".into(),
        ..entry(3)
    });
    let f = fixture_with(config, &[1, 2]);

    let summary = f.service.start_many(StartMode::All).unwrap();
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.failed, 1);
    let broken = summary.results.iter().find(|r| r.alias == "broken").unwrap();
    assert!(!broken.success);
    assert!(broken.error.as_deref().unwrap().contains("no collateral keys"));
}

// ---- Batches ----

#[test]
fn created_batch_decodes_and_relays() {
    let f = fixture(&[1, 2]);
    let created = f.service.create_all().unwrap();
    assert_eq!(created.summary.successful, 2);
    assert!(f.service.registry().is_empty());

    let decoded = f.service.decode_batch(&created.hex).unwrap();
    assert_eq!(decoded.entries.len(), 2);
    assert_eq!(decoded.failed, 0);
    assert_eq!(decoded.entries[0].outpoint, outpoint(1).to_string());

    let relayed = f.service.relay_batch(&created.hex, false).unwrap();
    assert_eq!(relayed.successful, 2);
    assert_eq!(f.service.registry().len(), 2);
    assert_eq!(f.transport.relayed().len(), 2);
}

#[test]
fn fast_relay_only_checks_signatures() {
    let f = fixture(&[1, 2]);
    let good = f.service.create_alias("mn1").unwrap();
    let mut forged = f.service.create_alias("mn2").unwrap();
    forged.signature.0[3] ^= 0x01;
    let hex = encode_batch_hex(&[good, forged]);

    let decoded = f.service.decode_batch(&hex).unwrap();
    assert_eq!((decoded.entries.len(), decoded.failed), (1, 1));

    let relayed = f.service.relay_batch(&hex, true).unwrap();
    assert_eq!((relayed.successful, relayed.failed), (1, 1));
    assert!(f.service.registry().find(&outpoint(1)).is_some());
    assert!(f.service.registry().find(&outpoint(2)).is_none());
}

#[test]
fn malformed_batch_leaves_registry_untouched() {
    let f = fixture(&[1, 2]);
    f.service.start_alias("mn1").unwrap();
    let before = f.service.registry().snapshot();
    let relayed_before = f.transport.relayed().len();

    let batch = encode_batch_hex(&[f.service.create_alias("mn2").unwrap()]);
    let truncated = &batch[..batch.len() - 20];

    assert!(matches!(
        f.service.decode_batch("xyz"),
        Err(NodeError::Codec(_))
    ));
    for bad in ["not hex at all", truncated] {
        assert!(matches!(
            f.service.relay_batch(bad, false),
            Err(NodeError::Codec(_))
        ));
        assert!(matches!(
            f.service.relay_batch(bad, true),
            Err(NodeError::Codec(_))
        ));
    }

    assert_eq!(f.service.registry().snapshot(), before);
    assert!(f.service.registry().find(&outpoint(2)).is_none());
    assert_eq!(f.transport.relayed().len(), relayed_before);
}

// ---- Peer messages ----

#[test]
fn peer_messages_are_decoded_and_applied() {
    let f = fixture(&[1]);
    let broadcast = f.service.create_alias("mn1").unwrap();
    let bytes = encode_message(&WireMessage::Broadcast(broadcast.clone()));

    let accepted = f.service.handle_message(&bytes).unwrap();
    assert!(matches!(accepted, Accepted::Added { .. }));
    assert_eq!(f.transport.relayed(), vec![broadcast.inventory()]);
    assert_eq!(f.service.handle_message(&bytes), Ok(Accepted::Unchanged));

    let err = f.service.handle_message(&[0xde, 0xad]).unwrap_err();
    assert_eq!(err.misbehavior(), 1);
}

#[test]
fn rejected_messages_are_counted() {
    let f = fixture(&[1]);
    let mut broadcast = f.service.create_alias("mn1").unwrap();
    broadcast.signature.0[0] ^= 0xff;
    let err = f.service.handle_broadcast(&broadcast).unwrap_err();
    assert_eq!(err.misbehavior(), 100);
    assert_eq!(f.service.metrics().broadcasts_rejected.get(), 1);
    assert!(f.transport.relayed().is_empty());
}

// ---- Queries ----

#[test]
fn list_modes_and_filter() {
    let f = fixture(&[1, 2]);
    f.service.start_many(StartMode::All).unwrap();

    let status = f.service.list(ListMode::Status, "").unwrap();
    assert_eq!(status.len(), 2);
    assert_eq!(status[&outpoint(1).to_string()], "PRE_ENABLED");

    let addr = f.service.list(ListMode::Addr, "10.0.0.2").unwrap();
    assert_eq!(addr.len(), 1);
    assert_eq!(addr[&outpoint(2).to_string()], "10.0.0.2:25565");

    let ranks = f.service.list(ListMode::Rank, "").unwrap();
    let mut values: Vec<u64> = ranks.values().map(|v| v.as_u64().unwrap()).collect();
    values.sort();
    assert_eq!(values, vec![1, 2]);

    let full = f.service.list(ListMode::Full, "").unwrap();
    let line = full[&outpoint(1).to_string()].as_str().unwrap();
    assert!(line.contains("PRE_ENABLED"));
    assert!(line.ends_with("10.0.0.1:25565"));
}

#[test]
fn counts_follow_registry_state() {
    let f = fixture(&[1, 2, 3]);
    start_and_enable(&f, &[1, 2]);
    f.service.start_alias("mn3").unwrap();

    assert_eq!(f.service.count(CountMode::Total).unwrap(), CountReport::Single(3));
    assert_eq!(f.service.count(CountMode::Enabled).unwrap(), CountReport::Single(2));
    assert_eq!(
        f.service.count(CountMode::All).unwrap(),
        CountReport::All {
            total: 3,
            mixing: 2,
            enabled: 2,
            qualify: 2,
        }
    );
}

#[test]
fn winner_and_schedule() {
    let f = fixture(&[1, 2]);
    start_and_enable(&f, &[1, 2]);

    let winner = f.service.winner(WinnerTarget::Current).unwrap().unwrap();
    assert_eq!(winner.height, TIP + 1);
    assert_eq!(winner.qualifying, 2);

    let schedule = f.service.winners(TIP + 1, 2, "");
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0].outpoint, winner.outpoint);
    assert_ne!(schedule[0].outpoint, schedule[1].outpoint);

    let filtered = f.service.winners(TIP + 1, 2, &schedule[1].payee);
    assert_eq!(filtered.len(), 1);
}

#[test]
fn winner_is_none_without_enabled_nodes() {
    let f = fixture(&[1]);
    f.service.start_alias("mn1").unwrap();
    assert_eq!(f.service.winner(WinnerTarget::Upcoming).unwrap(), None);
}

#[test]
fn rank_of_known_and_unknown() {
    let f = fixture(&[1, 2]);
    f.service.start_many(StartMode::All).unwrap();
    let rank = f.service.rank_of(&outpoint(1)).unwrap().unwrap();
    assert!((1..=2).contains(&rank));
    assert_eq!(f.service.rank_of(&outpoint(9)).unwrap(), None);
}

#[test]
fn genkey_produces_usable_keys() {
    let key = SafenodeService::genkey();
    assert_eq!(key.len(), 64);
    assert!(private_key_from_hex(&key).is_ok());
    assert_ne!(key, SafenodeService::genkey());
}

#[test]
fn connect_goes_through_transport() {
    let f = fixture(&[]);
    f.service.connect("10.0.0.5:25565").unwrap();
    assert_eq!(f.transport.connections().len(), 1);

    assert!(f.service.connect("not an address").is_err());
    f.transport.refuse_connections();
    assert!(matches!(
        f.service.connect("10.0.0.6:25565"),
        Err(NodeError::ConnectFailed(_))
    ));
}

#[test]
fn outputs_and_conf_listing() {
    let f = fixture(&[1, 2]);
    assert_eq!(f.service.outputs(), vec![outpoint(1), outpoint(2)]);

    let before = f.service.list_conf();
    assert!(before.iter().all(|c| c.status == "MISSING"));

    f.service.start_alias("mn2").unwrap();
    let after = f.service.list_conf();
    assert_eq!(after[0].status, "MISSING");
    assert_eq!(after[1].status, "PRE_ENABLED");
}

#[test]
fn local_node_needs_operator_key() {
    let config = NodeConfig {
        local_node: true,
        ..NodeConfig::default()
    };
    let result = SafenodeService::new(
        config,
        Arc::new(NullChain::new(TIP)),
        Arc::new(NullTransport::new()),
        Arc::new(NullWallet::new()),
        Arc::new(NullClock::new(0)),
    );
    assert!(matches!(result, Err(NodeError::Config(_))));
}

// ---- Maintenance ----

#[test]
fn maintenance_drops_spent_nodes() {
    let f = fixture(&[1, 2]);
    f.service.start_many(StartMode::All).unwrap();
    f.chain.spend(&outpoint(1));
    f.clock.advance(10);

    let update = f.service.run_maintenance();
    assert_eq!(update.removed, vec![outpoint(1)]);
    assert_eq!(update.total, 1);
    assert_eq!(f.service.metrics().nodes_total.get(), 1);
    assert!(f.service.registry().find(&outpoint(1)).is_none());
}

#[test]
fn election_at_maximum_height_saturates() {
    let f = fixture(&[1]);
    start_and_enable(&f, &[1]);
    f.chain.set_tip(u32::MAX);

    let winner = f.service.winner(WinnerTarget::Upcoming).unwrap().unwrap();
    assert_eq!(winner.height, u32::MAX);
    assert_eq!(winner.outpoint, outpoint(1).to_string());
    assert!(matches!(
        f.service.count(CountMode::Qualify).unwrap(),
        CountReport::Single(1)
    ));
}

#[tokio::test]
async fn maintenance_loop_runs_until_stopped() {
    let f = fixture(&[1]);
    f.service.start_alias("mn1").unwrap();
    let service = Arc::new(f.service);

    let task = safenode_node::spawn_maintenance(service.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    let passes = task.stop().await.unwrap();
    assert!(passes >= 1);
    assert_eq!(service.metrics().nodes_total.get(), 1);
}

#[tokio::test]
async fn dropped_maintenance_task_ends_the_loop() {
    let f = fixture(&[1]);
    let service = Arc::new(f.service);
    let task = safenode_node::spawn_maintenance(service.clone(), Duration::from_millis(5));
    drop(task);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(Arc::strong_count(&service), 1);
}
