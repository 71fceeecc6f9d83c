//! Collateral validation against the chain.

use safenode_messages::rejection::{MISBEHAVIOR_MINOR, MISBEHAVIOR_MISMATCH};
use safenode_messages::{BroadcastMessage, Rejection};
use safenode_types::NodeParams;

use crate::chain::ChainView;

/// Check that `broadcast` is backed by a confirmed collateral output of the
/// right amount owned by its collateral key.
///
/// Returns the height of the block that mined the collateral. Missing,
/// spent or under-confirmed collateral is stale: the sender may simply be
/// ahead of us.
pub fn check_outpoint(
    chain: &dyn ChainView,
    broadcast: &BroadcastMessage,
    params: &NodeParams,
) -> Result<u32, Rejection> {
    let outpoint = broadcast.outpoint;
    let Some(info) = chain.collateral(&outpoint) else {
        return Err(Rejection::stale(format!("collateral {outpoint} not found")));
    };
    if info.spent {
        return Err(Rejection::stale(format!("collateral {outpoint} is spent")));
    }
    if info.value != params.collateral_amount {
        return Err(Rejection::structural(
            format!(
                "collateral {outpoint} holds {} instead of {}",
                info.value, params.collateral_amount
            ),
            MISBEHAVIOR_MISMATCH,
        ));
    }

    let tip = chain.tip_height();
    let confirmations = info.confirmations(tip);
    if confirmations < params.collateral_min_confirmations {
        return Err(Rejection::stale(format!(
            "collateral {outpoint} has {confirmations} of {} confirmations",
            params.collateral_min_confirmations
        )));
    }

    if info.owner != broadcast.collateral_key {
        return Err(Rejection::structural(
            format!("collateral {outpoint} is not owned by the announcing key"),
            MISBEHAVIOR_MISMATCH,
        ));
    }

    // The announcement may not predate the block that confirmed the collateral.
    let confirmed_at = info
        .height
        .saturating_add(params.collateral_min_confirmations.saturating_sub(1));
    if let Some(block_time) = chain.block_time(confirmed_at) {
        if broadcast.sig_time < block_time {
            return Err(Rejection::structural(
                format!(
                    "announcement for {outpoint} signed at {} before collateral confirmed at {block_time}",
                    broadcast.sig_time
                ),
                MISBEHAVIOR_MINOR,
            ));
        }
    }

    Ok(info.height)
}
