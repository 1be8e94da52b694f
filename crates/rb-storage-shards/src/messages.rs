//! Wire messages of the storage-shard protocol.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// One account write shipped to a shard.
///
/// Carries the *unhashed* address; the shard re-derives the trie key
/// itself. Balance travels as 32-byte big-endian, nonce as a fixed 64-bit
/// integer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOp {
    pub account: Address,
    pub balance: [u8; 32],
    pub nonce: u64,
}

/// Per-shard commit message for one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMsg {
    /// The full RLP-encoded block.
    pub rlp_block: Vec<u8>,
    /// Serialized root node of the post-state trie, for reanchoring.
    pub merkle_tree_nodes: Vec<u8>,
    /// Writes routed to this shard (possibly empty).
    pub operations: Vec<UpdateOp>,
}

/// Request envelope on the shard wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ShardRequest {
    Update(UpdateMsg),
}

/// Reply envelope on the shard wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ShardReply {
    Ok,
    Error(String),
}
