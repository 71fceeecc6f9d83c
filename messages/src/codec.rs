//! Canonical wire encoding.
//!
//! All messages use bincode with little-endian fixed-width integers and
//! u64 length prefixes. Field order of each struct defines the bytes that
//! are signed and hashed. Broadcast batches travel as hex text.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::broadcast::BroadcastMessage;
use crate::ping::PingMessage;
use crate::verification::VerificationMessage;

/// Upper bound on a single decoded payload.
pub const MAX_MESSAGE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("input is not valid hex")]
    NotHex,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

/// Canonical bytes of a plain-data value, used for signing and hashing.
pub(crate) fn canonical<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    wire_options()
        .serialize(value)
        .expect("plain-data messages are always serializable")
}

/// A message as carried between peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireMessage {
    Broadcast(BroadcastMessage),
    Ping(PingMessage),
    Verification(VerificationMessage),
}

pub fn encode_message(message: &WireMessage) -> Vec<u8> {
    canonical(message)
}

/// Decode a single peer message. Trailing bytes are rejected.
pub fn decode_message(bytes: &[u8]) -> Result<WireMessage, CodecError> {
    decode(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    wire_options()
        .with_limit(MAX_MESSAGE_BYTES)
        .deserialize(bytes)
        .map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Serialise a list of broadcasts and hex-encode the result.
pub fn encode_batch_hex(batch: &[BroadcastMessage]) -> String {
    hex::encode(canonical(batch))
}

/// Decode a hex batch produced by [`encode_batch_hex`].
///
/// Non-hex input is rejected before any deserialisation. Decoding is
/// atomic: one malformed entry fails the whole batch.
pub fn decode_batch_hex(text: &str) -> Result<Vec<BroadcastMessage>, CodecError> {
    let text = text.trim();
    if !is_hex(text) {
        return Err(CodecError::NotHex);
    }
    let bytes = hex::decode(text).map_err(|_| CodecError::NotHex)?;
    decode(&bytes)
}

fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit())
}
