//! Building announcements from configuration strings.

use safenode_crypto::{keypair_from_private, private_key_from_hex};
use safenode_messages::{BroadcastMessage, CreateContext};
use safenode_types::{Outpoint, ServiceAddr};

use crate::contracts::Wallet;
use crate::NodeError;

/// Parse the textual fields of a node entry and sign an announcement.
///
/// The collateral keys come from `wallet`, which must be unlocked.
pub fn create_from_strings(
    address: &str,
    operator_key: &str,
    collateral_txid: &str,
    collateral_index: &str,
    wallet: &dyn Wallet,
    ctx: &CreateContext,
) -> Result<BroadcastMessage, NodeError> {
    let addr = ServiceAddr::parse(address)?;
    let operator = keypair_from_private(private_key_from_hex(operator_key)?);
    let outpoint = Outpoint::from_parts(collateral_txid, collateral_index)?;

    if wallet.is_locked() {
        return Err(NodeError::WalletLocked);
    }
    let collateral = wallet
        .collateral_keys(&outpoint)
        .ok_or_else(|| NodeError::CollateralNotFound(outpoint.to_string()))?;

    Ok(BroadcastMessage::create(outpoint, addr, &collateral, &operator, ctx)?)
}
