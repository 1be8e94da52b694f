//! # Verifier Runtime
//!
//! Startup and wiring for the RainBlock verifier node: configuration,
//! genesis import, storage-shard preflight, and the hand-off to the block
//! generator loop.

pub mod config;
pub mod genesis;
pub mod node;

pub use config::VerifierConfig;
pub use node::run_node;

/// Software version advertised in handshakes.
pub const VERSION: &str = concat!("rainblock-verifier/", env!("CARGO_PKG_VERSION"));
