//! Election inputs.

use safenode_types::{NodeState, Outpoint, Timestamp};

/// The facts about one registry record that the election looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub outpoint: Outpoint,
    pub state: NodeState,
    pub protocol_version: u32,
    /// Signing time of the record's current announcement.
    pub sig_time: Timestamp,
    /// Height of the last payment; 0 when never paid.
    pub last_paid_height: u32,
    /// Height of the block that mined the collateral, if known.
    pub collateral_height: Option<u32>,
}

impl Candidate {
    /// Whether the record's state allows it to be paid.
    ///
    /// `WatchdogExpired` records stay payable unless watchdog votes are
    /// required.
    pub fn is_payable(&self, watchdog_required: bool) -> bool {
        match self.state {
            NodeState::Enabled => true,
            NodeState::WatchdogExpired => !watchdog_required,
            _ => false,
        }
    }

    /// Confirmations of the collateral at `tip`; 0 when unknown.
    pub fn collateral_age(&self, tip: u32) -> u32 {
        match self.collateral_height {
            Some(h) if h <= tip => (tip - h).saturating_add(1),
            _ => 0,
        }
    }
}

/// Explicit toggles and chain facts for one election run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElectionParams {
    pub min_payment_protocol: u32,
    pub watchdog_required: bool,
    /// Skip records whose announcement or collateral is younger than one
    /// full payment cycle.
    pub filter_sig_time: bool,
    pub now: Timestamp,
    pub tip_height: u32,
}
