//! Error types for trie traversal and updates.

use rlp::DecoderError;
use shared_types::Hash;
use thiserror::Error;

/// Result type alias for trie operations.
pub type Result<T> = std::result::Result<T, TrieError>;

/// Errors that can occur while reading or rebuilding the partial trie.
#[derive(Debug, Error)]
pub enum TrieError {
    /// Traversal reached a hash-only stub and none of the supplied bags
    /// held the node.
    #[error("structural miss: no witness for node {}", hex::encode(missing))]
    StructuralMiss {
        /// Hash of the missing node.
        missing: Hash,
    },

    /// A witness or advertised node failed to decode.
    #[error("node decode: {0}")]
    Decode(#[from] DecoderError),
}

impl TrieError {
    /// Whether the error is a missing-witness miss (transaction-scoped)
    /// rather than a malformed node.
    pub fn is_structural_miss(&self) -> bool {
        matches!(self, Self::StructuralMiss { .. })
    }
}
