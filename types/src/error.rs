//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for safenode values.
#[derive(Debug, Error)]
pub enum SafenodeError {
    #[error("invalid service address: {0}")]
    InvalidAddress(String),

    #[error("invalid collateral outpoint: {0}")]
    InvalidOutpoint(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
