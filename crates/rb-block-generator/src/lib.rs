//! # Block Generator
//!
//! Loops once per block height:
//!
//! 1. adopt a peer block if one already arrived for this height
//! 2. gather queued transactions (up to the configured cap)
//! 3. execute them in proposal mode
//! 4. build the transactions root
//! 5. race the proof-of-stake timer against peer-block arrival
//! 6. on winning: commit to the 16 storage shards, gossip the block and
//!    its used trie nodes, advance
//! 7. on losing: adopt the peer block and requeue the gathered batch
//! 8. prune the state cache
//!
//! Client replies fire as soon as execution decides each transaction's
//! fate; the race may still be pending.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod generator;

pub use checkpoint::CheckpointLog;
pub use config::GeneratorConfig;
pub use error::GeneratorError;
pub use generator::BlockGenerator;
