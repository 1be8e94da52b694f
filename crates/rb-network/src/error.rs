//! Error types for peer communication.

use thiserror::Error;

/// Result type alias for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors from talking to neighbor verifiers.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Socket-level failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Wire envelope could not be encoded or decoded.
    #[error("wire: {0}")]
    Wire(String),
}
