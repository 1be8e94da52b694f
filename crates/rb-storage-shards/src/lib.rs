//! # Storage Shard Client
//!
//! The verifier commits every proposed block to 16 storage shards. A
//! write-set entry lands on exactly one shard, selected by the top nibble
//! of the Keccak hash of its address; every shard receives the RLP block
//! and the serialized trie root so it can reanchor its subtree even when
//! it holds no operations for the block.

pub mod client;
pub mod error;
pub mod messages;
pub mod routing;

pub use client::{RecordingShardClient, ShardClient, ShardPool, TcpShardClient};
pub use error::StorageError;
pub use messages::{ShardReply, ShardRequest, UpdateMsg, UpdateOp};
pub use routing::{build_update_messages, partition_operations, shard_index, SHARD_COUNT};
