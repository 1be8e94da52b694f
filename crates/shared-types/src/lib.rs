//! # Shared Types Crate
//!
//! Domain entities shared across the verifier subsystems.
//!
//! ## Clusters
//!
//! - **State**: [`Account`] and the sentinel digests for empty code/storage
//! - **Chain**: [`BlockHeader`], [`Block`] with canonical Ethereum RLP
//! - **Transactions**: [`Transaction`] decoding with sender recovery,
//!   [`TransactionData`] (the queued record carrying its witness bag), and
//!   the [`TransactionQueue`] drained by the block generator

pub mod account;
pub mod block;
pub mod crypto;
pub mod queue;
pub mod transaction;

pub use account::Account;
pub use block::{Block, BlockHeader};
pub use crypto::{
    hash_address, keccak256, Address, Hash, EMPTY_STRING_HASH, EMPTY_TRIE_ROOT,
};
pub use queue::TransactionQueue;
pub use transaction::{
    sign_transaction, ErrorCode, ReplyHandle, Transaction, TransactionData,
    TransactionDecodeError,
};
