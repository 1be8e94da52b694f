//! Error types for the verifier API surface.

use shared_types::TransactionDecodeError;
use thiserror::Error;

/// Errors from decoding inbound submissions. All of them resolve to a
/// synchronous `Invalid` reply; the verifier's own state is untouched.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transaction RLP or its signature failed to decode.
    #[error("transaction: {0}")]
    Transaction(#[from] TransactionDecodeError),

    /// A witness entry is not a well-formed trie node.
    #[error("witness: {0}")]
    Witness(#[from] rlp::DecoderError),
}
