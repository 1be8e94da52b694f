//! # Network Learner
//!
//! Peer verifiers stream trie nodes and whole blocks at us; this crate
//! indexes them. Learned nodes serve as fallback witness bags during
//! execution (and as the primary bag when adopting a peer block); learned
//! blocks feed the block generator's race.
//!
//! The generator and the learner never own each other: the learner signals
//! block arrivals through a bounded channel the generator selects on.

pub mod advertiser;
pub mod error;
pub mod framing;
pub mod learner;

pub use advertiser::{NeighborSet, NeighborTransport};
pub use error::NetworkError;
pub use learner::NetworkLearner;
