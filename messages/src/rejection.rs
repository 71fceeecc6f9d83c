//! Rejection classes for untrusted protocol input.
//!
//! Every check returns one of three disjoint classes. Only structural and
//! cryptographic rejections carry a misbehaviour weight for the sender;
//! stale input can arise from benign reordering and is never penalised.

use thiserror::Error;

/// Weight for minor structural problems (future timestamps, old versions).
pub const MISBEHAVIOR_MINOR: u32 = 1;
/// Weight for a bad verification signature.
pub const MISBEHAVIOR_BAD_VERIFICATION: u32 = 20;
/// Weight for a bad ping signature or a collateral/key mismatch.
pub const MISBEHAVIOR_MISMATCH: u32 = 33;
/// Weight for a forged announcement.
pub const MISBEHAVIOR_FORGED: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Malformed input, rejected before any mutation.
    #[error("malformed: {reason}")]
    Structural { reason: String, misbehavior: u32 },

    /// A signature or key did not verify.
    #[error("bad signature: {reason}")]
    Cryptographic { reason: String, misbehavior: u32 },

    /// Outdated or conflicting with newer state; a benign no-op.
    #[error("ignored: {reason}")]
    Stale { reason: String },
}

impl Rejection {
    pub fn structural(reason: impl Into<String>, misbehavior: u32) -> Self {
        Self::Structural {
            reason: reason.into(),
            misbehavior,
        }
    }

    pub fn cryptographic(reason: impl Into<String>, misbehavior: u32) -> Self {
        Self::Cryptographic {
            reason: reason.into(),
            misbehavior,
        }
    }

    pub fn stale(reason: impl Into<String>) -> Self {
        Self::Stale {
            reason: reason.into(),
        }
    }

    /// Penalty the transport layer should apply to the sender.
    pub fn misbehavior(&self) -> u32 {
        match self {
            Self::Structural { misbehavior, .. } | Self::Cryptographic { misbehavior, .. } => {
                *misbehavior
            }
            Self::Stale { .. } => 0,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Structural { reason, .. }
            | Self::Cryptographic { reason, .. }
            | Self::Stale { reason } => reason,
        }
    }
}
