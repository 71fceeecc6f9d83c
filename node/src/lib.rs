//! Safenode-aware node: configuration, collaborator contracts and the
//! command surface over the registry.
//!
//! The node is the coordinator that:
//! - Loads operator configuration from TOML
//! - Feeds peer announcements, pings and verifications into the registry
//! - Relays accepted inventory through the transport
//! - Starts the operator's own safenodes
//! - Runs periodic maintenance and exports metrics

pub mod commands;
pub mod config;
pub mod contracts;
pub mod create;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod service;
pub mod tracing_spans;

pub use commands::{
    AliasResult, ConfEntry, CountMode, CountReport, CreateSummary, DecodeSummary,
    DecodedBroadcast, ListMode, RelayResult, RelaySummary, ScheduledPayee, StartMode,
    StartSummary, WinnerInfo, WinnerTarget,
};
pub use config::{NodeConfig, NodeEntry, ParamsOverride};
pub use contracts::{Clock, SystemClock, Transport, Wallet};
pub use create::create_from_strings;
pub use error::NodeError;
pub use maintenance::{spawn_maintenance, MaintenanceTask};
pub use metrics::RegistryMetrics;
pub use service::{decode_batch, SafenodeService, PING_BLOCK_DEPTH};
