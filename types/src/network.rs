//! Network identifier.

use serde::{Deserialize, Serialize};

/// Identifies which network a node is connected to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network.
    #[default]
    Dev,
}

impl NetworkId {
    /// Default P2P port for this network. Live safenodes must listen on it.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Live => 5565,
            Self::Test => 15565,
            Self::Dev => 25565,
        }
    }

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }

    /// Parse a network name; unknown names fall back to `Dev`.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "live" | "main" | "mainnet" => Self::Live,
            "test" | "testnet" => Self::Test,
            _ => Self::Dev,
        }
    }
}
