//! Next-payee selection.

use safenode_types::{BlockHash, NodeState, Outpoint};
use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, ElectionParams};
use crate::score::{score, Score};

/// Seconds of announcement age required per enabled node when filtering by
/// signing time: one full rotation at 2.6 minutes per block.
pub const SIG_TIME_SECONDS_PER_NODE: u64 = 156;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub outpoint: Outpoint,
    pub score: Score,
    pub last_paid_height: u32,
}

/// Result of one election run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub winner: Option<Winner>,
    /// Number of candidates that passed eligibility.
    pub qualifying: usize,
}

fn is_eligible(c: &Candidate, params: &ElectionParams, filter: bool, enabled: usize) -> bool {
    if !c.is_payable(params.watchdog_required) {
        return false;
    }
    if c.protocol_version < params.min_payment_protocol {
        return false;
    }
    if filter {
        let min_age = enabled as u64 * SIG_TIME_SECONDS_PER_NODE;
        if c.sig_time.saturating_add(min_age) > params.now {
            return false;
        }
        if (c.collateral_age(params.tip_height) as usize) < enabled {
            return false;
        }
    }
    true
}

/// Pick the payee for the block whose anchor hash is `anchor`.
///
/// The longest-waiting eligible candidate wins (never paid counts as height
/// 0). Ties go to the smallest score, then to the smallest outpoint. When
/// the signing-time filter leaves fewer than a third of the enabled nodes,
/// the election is rerun without it.
pub fn select_payee(
    candidates: &[Candidate],
    anchor: &BlockHash,
    params: &ElectionParams,
) -> Selection {
    let enabled = candidates
        .iter()
        .filter(|c| c.state == NodeState::Enabled)
        .count();

    let mut eligible: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| is_eligible(c, params, params.filter_sig_time, enabled))
        .collect();

    if params.filter_sig_time && eligible.len() < enabled / 3 {
        eligible = candidates
            .iter()
            .filter(|c| is_eligible(c, params, false, enabled))
            .collect();
    }

    let winner = eligible
        .iter()
        .map(|c| Winner {
            outpoint: c.outpoint,
            score: score(&c.outpoint, anchor),
            last_paid_height: c.last_paid_height,
        })
        .min_by(|a, b| {
            a.last_paid_height
                .cmp(&b.last_paid_height)
                .then(a.score.cmp(&b.score))
                .then(a.outpoint.cmp(&b.outpoint))
        });

    Selection {
        winner,
        qualifying: eligible.len(),
    }
}

/// Simulate the queue over `count` heights starting at `from`.
///
/// Each winner is treated as paid at its height before the next height is
/// computed. Stops early when an anchor hash is unknown or nobody is
/// eligible.
pub fn upcoming_winners(
    candidates: &[Candidate],
    from: u32,
    count: u32,
    anchor_for: impl Fn(u32) -> Option<BlockHash>,
    params: &ElectionParams,
) -> Vec<(u32, Winner)> {
    let mut pool = candidates.to_vec();
    let mut out = Vec::new();

    for height in from..from.saturating_add(count) {
        let Some(anchor) = anchor_for(height) else {
            break;
        };
        let Some(winner) = select_payee(&pool, &anchor, params).winner else {
            break;
        };
        if let Some(c) = pool.iter_mut().find(|c| c.outpoint == winner.outpoint) {
            c.last_paid_height = height;
        }
        out.push((height, winner));
    }
    out
}
