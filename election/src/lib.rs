//! Payment-queue election.
//!
//! Every full node runs the same pure computation over the same registry
//! snapshot and chain facts, so all of them agree on whose turn it is to
//! be paid at a given height. Nothing here touches shared state: callers
//! populate [`Candidate`] values from their records and pass them in.

pub mod candidate;
pub mod queue;
pub mod score;

pub use candidate::{Candidate, ElectionParams};
pub use queue::{select_payee, upcoming_winners, Selection, Winner, SIG_TIME_SECONDS_PER_NODE};
pub use score::{anchor_height, rank, score, RankedNode, Score};
