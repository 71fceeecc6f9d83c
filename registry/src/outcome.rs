//! Results of processing protocol input.

use safenode_messages::{Inventory, Rejection};
use safenode_types::Outpoint;

use crate::governance::GovernanceHash;

/// A message that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Accepted {
    /// A new record was created.
    Added { relay: Vec<Inventory> },
    /// An existing record changed.
    Updated { relay: Vec<Inventory> },
    /// Valid, but nothing changed: a replay or a rate-limited announcement.
    Unchanged,
    /// A ping for an outpoint with no record. The caller should ask the
    /// sender for the announcement.
    UnknownNode { outpoint: Outpoint },
}

impl Accepted {
    /// Inventory the caller should hand to the transport after unlocking.
    pub fn relay(&self) -> &[Inventory] {
        match self {
            Self::Added { relay } | Self::Updated { relay } => relay,
            Self::Unchanged | Self::UnknownNode { .. } => &[],
        }
    }
}

pub type Outcome = Result<Accepted, Rejection>;

/// Changes accumulated since the last [`crate::Registry::notify_dependents`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryUpdate {
    pub added: bool,
    pub removed: Vec<Outpoint>,
    /// Governance objects whose votes must be recomputed.
    pub dirty_governance: Vec<GovernanceHash>,
    pub total: usize,
    pub enabled: usize,
}
