//! Shard routing: top nibble of `keccak(address)` selects one of 16
//! shards. The partition is total and disjoint by construction.

use crate::messages::{UpdateMsg, UpdateOp};
use rb_execution::WriteSet;
use shared_types::Hash;

/// Number of storage shards. Fixed by the protocol.
pub const SHARD_COUNT: usize = 16;

/// Shard index for a hashed address: the top 4 bits of byte 0.
pub fn shard_index(hashed_address: &Hash) -> usize {
    (hashed_address[0] >> 4) as usize
}

/// Partition a write-set into per-shard operation lists.
pub fn partition_operations(write_set: &WriteSet) -> [Vec<UpdateOp>; SHARD_COUNT] {
    let mut shards: [Vec<UpdateOp>; SHARD_COUNT] = core::array::from_fn(|_| Vec::new());
    for (address, entry) in write_set.iter() {
        let mut balance = [0u8; 32];
        entry.account.balance.to_big_endian(&mut balance);
        shards[shard_index(&entry.hashed_address)].push(UpdateOp {
            account: *address,
            balance,
            nonce: entry.account.nonce.low_u64(),
        });
    }
    shards
}

/// Build the 16 per-shard update messages for one block. Every shard gets
/// the block and root bytes; only the owning shard gets each operation.
pub fn build_update_messages(
    rlp_block: &[u8],
    root_node: &[u8],
    write_set: &WriteSet,
) -> Vec<UpdateMsg> {
    partition_operations(write_set)
        .into_iter()
        .map(|operations| UpdateMsg {
            rlp_block: rlp_block.to_vec(),
            merkle_tree_nodes: root_node.to_vec(),
            operations,
        })
        .collect()
}
