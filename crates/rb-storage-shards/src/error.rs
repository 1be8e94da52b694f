//! Error types for shard communication.

use thiserror::Error;

/// Result type alias for shard operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from the storage-shard protocol.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A shard could not be reached within the startup timeout.
    #[error("shard {shard} unreachable: {reason}")]
    Unreachable { shard: usize, reason: String },

    /// A shard rejected or failed an update.
    #[error("shard {shard} update failed: {reason}")]
    UpdateFailed { shard: usize, reason: String },

    /// The pool was constructed with the wrong number of shards.
    #[error("expected {expected} shard clients, got {actual}")]
    WrongShardCount { expected: usize, actual: usize },

    /// Socket-level failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Wire envelope could not be encoded or decoded.
    #[error("wire: {0}")]
    Wire(String),
}
