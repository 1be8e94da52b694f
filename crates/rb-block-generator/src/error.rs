//! Error types for block production.

use thiserror::Error;

/// Result type alias for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors that stop the block generator.
///
/// Transaction-scoped problems never surface here; they are settled per
/// record during execution. Anything that does arrive is block-scoped and
/// treated as fatal for the verifier process.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// End-of-block trie rebuild failed during a proposal pass.
    #[error("execution: {0}")]
    Execution(#[from] rb_execution::ExecutionError),

    /// A storage shard failed the commit for a proposed block.
    #[error("storage: {0}")]
    Storage(#[from] rb_storage_shards::StorageError),

    /// Internal inconsistency, e.g. a used-node hash with no matching
    /// bytes.
    #[error("internal: {0}")]
    Internal(String),
}
