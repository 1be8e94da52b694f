//! Read-through composite view over witness-node maps.
//!
//! A traversal that reaches a hash-only stub resolves it through a chain
//! of bags: the per-transaction (or per-block shared) witness bag first,
//! then nodes learned from peers. The chain borrows the underlying maps;
//! nodes are never copied between them.

use shared_types::Hash;
use std::collections::HashMap;

/// Chained lookup over RLP-encoded trie nodes keyed by their Keccak hash.
#[derive(Clone, Default)]
pub struct BagChain<'a> {
    layers: Vec<&'a HashMap<Hash, Vec<u8>>>,
}

impl<'a> BagChain<'a> {
    /// A chain with no layers; every stub resolution misses.
    pub fn empty() -> Self {
        Self { layers: Vec::new() }
    }

    /// A chain over a single bag.
    pub fn single(bag: &'a HashMap<Hash, Vec<u8>>) -> Self {
        Self { layers: vec![bag] }
    }

    /// A chain consulting `primary` before `fallback`.
    pub fn layered(
        primary: &'a HashMap<Hash, Vec<u8>>,
        fallback: &'a HashMap<Hash, Vec<u8>>,
    ) -> Self {
        Self {
            layers: vec![primary, fallback],
        }
    }

    /// Append a lower-priority layer.
    pub fn push(mut self, bag: &'a HashMap<Hash, Vec<u8>>) -> Self {
        self.layers.push(bag);
        self
    }

    /// First hit across the layers.
    pub fn get(&self, hash: &Hash) -> Option<&'a [u8]> {
        self.layers
            .iter()
            .find_map(|layer| layer.get(hash).map(|bytes| bytes.as_slice()))
    }
}
