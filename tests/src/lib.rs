//! # RainBlock Verifier Test Suite
//!
//! End-to-end scenarios wiring the real crates together: the RPC surface
//! feeding the transaction queue, the network learner feeding the block
//! generator's race, and recording shard clients standing in for the
//! storage tier.

#[cfg(test)]
mod integration;
