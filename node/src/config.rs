//! Node configuration with TOML file support.

use safenode_types::{Amount, NetworkId, NodeParams};
use safenode_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::NodeError;

/// One operator-controlled safenode this process can start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub alias: String,
    /// `ip:port` the node listens on.
    pub address: String,
    /// Hex-encoded operational private key.
    pub operator_key: String,
    pub collateral_txid: String,
    pub collateral_index: u32,
}

/// Configuration for a safenode-aware node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to join.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether this process runs a safenode itself.
    #[serde(default)]
    pub local_node: bool,

    /// Hex operational key of the local safenode, when `local_node` is set.
    #[serde(default)]
    pub local_operator_key: Option<String>,

    /// Require recent watchdog votes for payment eligibility.
    #[serde(default)]
    pub watchdog_required: bool,

    /// Seconds between two maintenance passes over the registry.
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,

    /// Blocks scanned backwards when refreshing last-paid heights.
    #[serde(default = "default_payment_scan_back")]
    pub payment_scan_back: u32,

    /// Overrides layered over the network's default parameters.
    #[serde(default)]
    pub params: Option<ParamsOverride>,

    /// Safenodes controlled by this operator.
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
}

/// Per-field overrides of [`NodeParams`]. Unset fields keep the value the
/// configured network defines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsOverride {
    pub collateral_amount: Option<Amount>,
    pub protocol_floor: Option<u32>,
    pub min_payment_protocol: Option<u32>,
    pub min_mixing_protocol: Option<u32>,
    pub check_seconds: Option<u64>,
    pub min_broadcast_seconds: Option<u64>,
    pub min_ping_seconds: Option<u64>,
    pub expiration_seconds: Option<u64>,
    pub watchdog_max_seconds: Option<u64>,
    pub new_start_required_seconds: Option<u64>,
    pub max_future_drift_seconds: Option<u64>,
    pub ping_max_block_age: Option<u32>,
    pub verification_max_block_age: Option<u32>,
    pub collateral_min_confirmations: Option<u32>,
    pub score_anchor_depth: Option<u32>,
}

impl ParamsOverride {
    pub fn apply(&self, mut params: NodeParams) -> NodeParams {
        macro_rules! layer {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    params.$field = value;
                })*
            };
        }
        layer!(
            collateral_amount,
            protocol_floor,
            min_payment_protocol,
            min_mixing_protocol,
            check_seconds,
            min_broadcast_seconds,
            min_ping_seconds,
            expiration_seconds,
            watchdog_max_seconds,
            new_start_required_seconds,
            max_future_drift_seconds,
            ping_max_block_age,
            verification_max_block_age,
            collateral_min_confirmations,
            score_anchor_depth,
        );
        params
    }
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_maintenance_interval() -> u64 {
    60
}

fn default_payment_scan_back() -> u32 {
    400
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Parameters in effect: the network's defaults with any overrides
    /// applied on top.
    pub fn effective_params(&self) -> NodeParams {
        let defaults = NodeParams::for_network(self.network);
        match &self.params {
            Some(overrides) => overrides.apply(defaults),
            None => defaults,
        }
    }

    pub fn find_node(&self, alias: &str) -> Option<&NodeEntry> {
        self.nodes.iter().find(|n| n.alias == alias)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            local_node: false,
            local_operator_key: None,
            watchdog_required: false,
            maintenance_interval_secs: default_maintenance_interval(),
            payment_scan_back: default_payment_scan_back(),
            params: None,
            nodes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let mut config = NodeConfig::default();
        config.nodes.push(NodeEntry {
            alias: "mn1".into(),
            address: "10.0.0.1:25565".into(),
            operator_key: "11".repeat(32),
            collateral_txid: "ab".repeat(32),
            collateral_index: 1,
        });
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.maintenance_interval_secs, config.maintenance_interval_secs);
        assert_eq!(parsed.nodes, config.nodes);
        assert_eq!(parsed.network, NetworkId::Dev);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.maintenance_interval_secs, 60);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.log_level, "info");
        assert!(!config.watchdog_required);
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            network = "test"
            log_format = "json"
            watchdog_required = true

            [[nodes]]
            alias = "mn1"
            address = "203.0.113.7:15565"
            operator_key = "0101010101010101010101010101010101010101010101010101010101010101"
            collateral_txid = "abababababababababababababababababababababababababababababababab"
            collateral_index = 0
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network, NetworkId::Test);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.watchdog_required);
        assert_eq!(config.find_node("mn1").unwrap().collateral_index, 0);
        assert!(config.find_node("mn2").is_none());
    }

    #[test]
    fn params_follow_network_unless_overridden() {
        let config = NodeConfig::from_toml_str("network = \"live\"").unwrap();
        assert_eq!(config.effective_params(), NodeParams::live());

        let config = NodeConfig::from_toml_str(
            "network = \"test\"\n[params]\nmin_ping_seconds = 30\n",
        )
        .unwrap();
        let params = config.effective_params();
        assert_eq!(params.network, NetworkId::Test);
        assert_eq!(params.min_ping_seconds, 30);
    }

    #[test]
    fn partial_override_keeps_live_defaults() {
        let config = NodeConfig::from_toml_str(
            "network = \"live\"\n[params]\nmin_ping_seconds = 600\n",
        )
        .unwrap();
        let params = config.effective_params();
        assert_eq!(params.network, NetworkId::Live);
        assert_eq!(params.min_ping_seconds, 600);
        assert_eq!(params.collateral_min_confirmations, 15);
        assert_eq!(
            params,
            NodeParams {
                min_ping_seconds: 600,
                ..NodeParams::live()
            }
        );
    }

    #[test]
    fn unknown_param_is_a_config_error() {
        let result = NodeConfig::from_toml_str("[params]\nmin_pong_seconds = 1\n");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn overrides_survive_toml_round_trip() {
        let config = NodeConfig {
            network: NetworkId::Live,
            params: Some(ParamsOverride {
                collateral_min_confirmations: Some(30),
                ..ParamsOverride::default()
            }),
            ..NodeConfig::default()
        };
        let parsed = NodeConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(parsed.effective_params().collateral_min_confirmations, 30);
        assert_eq!(parsed.effective_params().min_ping_seconds, 600);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "maintenance_interval_secs = 5").unwrap();
        let config = NodeConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.maintenance_interval_secs, 5);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/safenode.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
