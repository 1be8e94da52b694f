//! Error types for transaction execution.

use primitive_types::U256;
use rb_state_trie::TrieError;
use thiserror::Error;

/// Result type alias for execution operations.
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Errors raised while applying a transaction or materializing the block.
///
/// Everything except [`ExecutionError::Trie`] raised from the end-of-block
/// rebuild is transaction-scoped: the offending transaction is marked
/// invalid and the rest of the batch proceeds.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Account absent from both the trie and the supplied witness bags.
    #[error("account {address} not found")]
    KeyNotFound {
        /// Hex-encoded address.
        address: String,
    },

    /// Trie traversal failure: missing witness or malformed node.
    #[error(transparent)]
    Trie(#[from] TrieError),

    /// The stored account value failed to decode.
    #[error("account decode: {0}")]
    AccountDecode(rlp::DecoderError),

    /// Transaction nonce does not match the sender's account nonce.
    #[error("nonce mismatch: account at {expected}, transaction carries {actual}")]
    NonceMismatch {
        /// Sender account nonce.
        expected: U256,
        /// Nonce carried by the transaction.
        actual: U256,
    },

    /// Debit would underflow the sender's balance.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    /// Contract creation transactions are not yet supported.
    #[error("contract creation not yet supported")]
    ContractCreationUnsupported,
}
