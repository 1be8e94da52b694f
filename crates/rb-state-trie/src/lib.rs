//! # Partial Merkle-Patricia Trie
//!
//! The verifier's state trie, held *partially* in memory. Nodes above the
//! prune boundary stay cached between blocks; everything deeper collapses
//! into hash-only stubs after each height. A traversal that reaches a stub
//! consults the witness bags supplied with the call: per-transaction
//! proofs first, then nodes learned from peers.
//!
//! ## Node Types
//!
//! - **Leaf**: terminal node with remaining path + value
//! - **Extension**: shared prefix optimization node
//! - **Branch**: 16-way branch + optional value
//!
//! A child reference is either an in-cache node or a bare hash stub (the
//! pruning boundary).
//!
//! ## Updates
//!
//! The trie is never mutated in place during execution. End-of-block
//! writes go through [`CachedTrie::batch_cow`], which returns a new trie
//! sharing every unchanged subtree with its predecessor.

pub mod bag;
pub mod error;
pub mod nibbles;
pub mod node;
pub mod trie;

pub use bag::BagChain;
pub use error::TrieError;
pub use nibbles::Nibbles;
pub use node::{rlp_to_merkle_node, MerkleNode, NodeRef};
pub use trie::{CachedTrie, UsedNodes};
