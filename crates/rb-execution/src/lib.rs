//! # Execution Engine
//!
//! Applies queued transactions in FIFO order against the cached state trie
//! and the witness bags they carry. All in-flight changes buffer in a
//! write-set; the canonical trie is read-only until the end-of-block
//! copy-on-write batch materializes the successor tree and its state root.
//!
//! Two modes:
//!
//! - **Proposal**: witness bags come from the submitting clients (unified
//!   into one shared bag per height when enabled)
//! - **Verify**: only peer-learned nodes are consulted, used when adopting
//!   a block produced by another verifier

pub mod engine;
pub mod error;
pub mod write_set;

pub use engine::{ExecutionConfig, ExecutionEngine, ExecutionResult};
pub use error::ExecutionError;
pub use write_set::{WriteSet, WriteSetEntry};
