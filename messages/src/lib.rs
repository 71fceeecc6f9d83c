//! Network messages of the safenode registry.
//!
//! - [`ping`]: frequent liveness attestation signed by the operational key.
//! - [`broadcast`]: full announcement signed by the collateral key, embedding a ping.
//! - [`verification`]: two-party challenge binding an address to an operational key.
//! - [`rejection`]: the three rejection classes and misbehaviour weights.
//! - [`codec`]: canonical wire encoding and the hex batch format.

pub mod broadcast;
pub mod codec;
pub mod inventory;
pub mod ping;
pub mod rejection;
pub mod verification;

pub use broadcast::{BroadcastMessage, CreateContext, CreateError};
pub use codec::{
    decode_batch_hex, decode_message, encode_batch_hex, encode_message, CodecError, WireMessage,
};
pub use inventory::{Inventory, InventoryKind, MessageHash};
pub use ping::PingMessage;
pub use rejection::Rejection;
pub use verification::VerificationMessage;
