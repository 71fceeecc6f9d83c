//! Argument and result types of the service surface.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::NodeError;

/// Which configured nodes `start_many` starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    All,
    /// Only nodes the registry does not know.
    Missing,
    /// Only nodes that are unknown or not enabled.
    Disabled,
}

/// Field reported per record by `list`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    ActiveSeconds,
    Addr,
    Full,
    LastSeen,
    LastPaidTime,
    LastPaidBlock,
    Protocol,
    Payee,
    Rank,
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountMode {
    Total,
    Mixing,
    Enabled,
    Qualify,
    All,
}

/// Height `winner` reports on, relative to the tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WinnerTarget {
    /// Tip + 1.
    Current,
    /// Tip + 10.
    Upcoming,
}

impl WinnerTarget {
    pub fn offset(&self) -> u32 {
        match self {
            Self::Current => 1,
            Self::Upcoming => 10,
        }
    }
}

macro_rules! keyword_enum {
    ($ty:ident { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = NodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(NodeError::Config(format!(
                        "unknown {} '{other}'",
                        stringify!($ty)
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(Self::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

keyword_enum!(StartMode { "all" => All, "missing" => Missing, "disabled" => Disabled });
keyword_enum!(ListMode {
    "activeseconds" => ActiveSeconds,
    "addr" => Addr,
    "full" => Full,
    "lastseen" => LastSeen,
    "lastpaidtime" => LastPaidTime,
    "lastpaidblock" => LastPaidBlock,
    "protocol" => Protocol,
    "payee" => Payee,
    "rank" => Rank,
    "status" => Status,
});
keyword_enum!(CountMode {
    "total" => Total,
    "mixing" => Mixing,
    "enabled" => Enabled,
    "qualify" => Qualify,
    "all" => All,
});
keyword_enum!(WinnerTarget { "current" => Current, "upcoming" => Upcoming });

/// Outcome for one alias in a batch command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AliasResult {
    pub alias: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AliasResult {
    pub fn ok(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(alias: &str, error: impl fmt::Display) -> Self {
        Self {
            alias: alias.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StartSummary {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<AliasResult>,
}

impl StartSummary {
    pub fn push(&mut self, result: AliasResult) {
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateSummary {
    #[serde(flatten)]
    pub summary: StartSummary,
    /// Hex batch of every announcement created.
    pub hex: String,
}

/// Human-facing view of one decoded announcement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedBroadcast {
    pub outpoint: String,
    pub addr: String,
    pub collateral_key: String,
    pub operator_key: String,
    pub sig_time: u64,
    pub protocol_version: u32,
    pub ping_sig_time: u64,
    pub ping_block_hash: String,
    pub hash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DecodeSummary {
    pub entries: Vec<DecodedBroadcast>,
    /// Entries whose signatures did not verify.
    pub failed: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelayResult {
    pub outpoint: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelaySummary {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<RelayResult>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CountReport {
    Single(usize),
    All {
        total: usize,
        mixing: usize,
        enabled: usize,
        qualify: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WinnerInfo {
    pub height: u32,
    pub outpoint: String,
    pub addr: String,
    pub payee: String,
    pub protocol: u32,
    pub last_seen: u64,
    pub active_seconds: u64,
    /// Records that passed eligibility in this election.
    pub qualifying: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledPayee {
    pub height: u32,
    pub outpoint: String,
    pub payee: String,
}

/// A configured node and what the registry currently says about it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfEntry {
    pub alias: String,
    pub address: String,
    pub operator_key: String,
    pub collateral_txid: String,
    pub collateral_index: u32,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_parse_and_print() {
        assert_eq!("missing".parse::<StartMode>().unwrap(), StartMode::Missing);
        assert_eq!("lastpaidblock".parse::<ListMode>().unwrap(), ListMode::LastPaidBlock);
        assert_eq!(CountMode::Qualify.to_string(), "qualify");
        assert!("bogus".parse::<ListMode>().is_err());
    }

    #[test]
    fn winner_offsets() {
        assert_eq!(WinnerTarget::Current.offset(), 1);
        assert_eq!(WinnerTarget::Upcoming.offset(), 10);
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = StartSummary::default();
        summary.push(AliasResult::ok("a"));
        summary.push(AliasResult::failed("b", "wallet is locked"));
        assert_eq!((summary.successful, summary.failed), (1, 1));
    }
}
