//! The cached, partially resident Merkle-Patricia trie.
//!
//! Reads record every traversed node so the block generator can
//! re-advertise them; hash stubs resolve through the caller's bag chain.
//! Writes never mutate in place: [`CachedTrie::batch_cow`] produces a new
//! trie that shares all unchanged subtrees with its predecessor through
//! `Arc` references.

use crate::bag::BagChain;
use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;
use crate::node::{rlp_to_merkle_node, MerkleNode, NodeRef};
use shared_types::{keccak256, Hash};
use std::collections::HashMap;

/// Every node traversed during a read or rebuild, keyed by hash.
///
/// The proposal path re-advertises these bytes to neighbor verifiers so
/// they can verify the block statelessly.
pub type UsedNodes = HashMap<Hash, Vec<u8>>;

/// A Merkle-Patricia trie whose nodes are cached between blocks and can be
/// pruned to hash stubs below a configured depth.
#[derive(Clone, Debug, Default)]
pub struct CachedTrie {
    root: NodeRef,
}

impl CachedTrie {
    /// An empty trie (`root_hash == EMPTY_TRIE_ROOT`).
    pub fn new() -> Self {
        Self {
            root: NodeRef::Empty,
        }
    }

    /// Build a fully resident trie from key/value pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let mut trie = Self::new();
        for (key, value) in entries {
            trie.insert(&key, value)
                .expect("resident trie has no stubs to miss");
        }
        trie
    }

    /// Root hash of the current state.
    pub fn root_hash(&self) -> Hash {
        self.root.hash()
    }

    /// RLP of the root node, children referenced by hash. Storage shards
    /// use this to reanchor their subtrees after every block.
    pub fn root_node_serialized(&self) -> Vec<u8> {
        match &self.root {
            NodeRef::Empty => vec![0x80],
            NodeRef::Hash(hash) => {
                let mut s = rlp::RlpStream::new();
                s.append(&hash.to_vec());
                s.out().to_vec()
            }
            NodeRef::Node(node) => node.rlp_encode(),
        }
    }

    /// Read a value, recording every traversed node into `used_nodes` and
    /// resolving hash stubs through `bags`.
    ///
    /// `Ok(None)` is a clean key-not-found; [`TrieError::StructuralMiss`]
    /// means the traversal hit a stub no bag could supply.
    pub fn get_with_bags(
        &self,
        key: &[u8],
        used_nodes: &mut UsedNodes,
        bags: &BagChain<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let path = Nibbles::from_bytes(key);
        Self::get_at(&self.root, &path, 0, used_nodes, bags)
    }

    /// Read from the resident cache only.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut used = UsedNodes::new();
        self.get_with_bags(key, &mut used, &BagChain::empty())
    }

    /// Insert into the resident cache (genesis loading and tests).
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let path = Nibbles::from_bytes(key);
        let mut used = UsedNodes::new();
        self.root = Self::cow_insert(&self.root, &path, 0, value, &mut used, &BagChain::empty())?;
        Ok(())
    }

    /// Apply a batch of puts copy-on-write, returning the successor trie.
    /// Unchanged subtrees are shared; `self` is untouched.
    pub fn batch_cow(
        &self,
        puts: &[(Vec<u8>, Vec<u8>)],
        used_nodes: &mut UsedNodes,
        bags: &BagChain<'_>,
    ) -> Result<CachedTrie> {
        let mut root = self.root.clone();
        for (key, value) in puts {
            let path = Nibbles::from_bytes(key);
            root = Self::cow_insert(&root, &path, 0, value.clone(), used_nodes, bags)?;
        }
        Ok(CachedTrie { root })
    }

    /// Collapse every node deeper than `retain_depth` into a hash stub,
    /// bounding the resident cache between blocks.
    pub fn prune_state_cache(&mut self, retain_depth: usize) {
        self.root = Self::prune_ref(&self.root, retain_depth);
    }

    fn prune_ref(node_ref: &NodeRef, depth_left: usize) -> NodeRef {
        let node = match node_ref {
            NodeRef::Empty | NodeRef::Hash(_) => return node_ref.clone(),
            NodeRef::Node(node) => node,
        };
        if depth_left == 0 {
            return NodeRef::Hash(node.hash());
        }
        match node.as_ref() {
            MerkleNode::Leaf { .. } => node_ref.clone(),
            MerkleNode::Extension { path, child } => NodeRef::from_node(MerkleNode::Extension {
                path: path.clone(),
                child: Self::prune_ref(child, depth_left - 1),
            }),
            MerkleNode::Branch { children, value } => {
                let pruned: [NodeRef; 16] =
                    core::array::from_fn(|i| Self::prune_ref(&children[i], depth_left - 1));
                NodeRef::from_node(MerkleNode::Branch {
                    children: Box::new(pruned),
                    value: value.clone(),
                })
            }
        }
    }

    /// Resolve a stub through the bag chain, recording the witness bytes.
    fn resolve(stub: &Hash, bags: &BagChain<'_>, used_nodes: &mut UsedNodes) -> Result<MerkleNode> {
        let bytes = bags
            .get(stub)
            .ok_or(TrieError::StructuralMiss { missing: *stub })?;
        let node = rlp_to_merkle_node(bytes)?;
        used_nodes.insert(*stub, bytes.to_vec());
        Ok(node)
    }

    /// Record a resident node's wire bytes.
    fn record(node: &MerkleNode, used_nodes: &mut UsedNodes) {
        let encoded = node.rlp_encode();
        used_nodes.insert(keccak256(&encoded), encoded);
    }

    fn get_at(
        node_ref: &NodeRef,
        path: &Nibbles,
        offset: usize,
        used_nodes: &mut UsedNodes,
        bags: &BagChain<'_>,
    ) -> Result<Option<Vec<u8>>> {
        let resolved;
        let node = match node_ref {
            NodeRef::Empty => return Ok(None),
            NodeRef::Node(node) => {
                Self::record(node, used_nodes);
                node.as_ref()
            }
            NodeRef::Hash(hash) => {
                resolved = Self::resolve(hash, bags, used_nodes)?;
                &resolved
            }
        };

        match node {
            MerkleNode::Leaf {
                path: leaf_path,
                value,
            } => {
                if path.slice(offset) == *leaf_path {
                    Ok(Some(value.clone()))
                } else {
                    Ok(None)
                }
            }
            MerkleNode::Extension {
                path: ext_path,
                child,
            } => {
                if path.slice(offset).starts_with(ext_path) {
                    Self::get_at(child, path, offset + ext_path.len(), used_nodes, bags)
                } else {
                    Ok(None)
                }
            }
            MerkleNode::Branch { children, value } => {
                if offset == path.len() {
                    Ok(value.clone())
                } else {
                    let index = path.at(offset) as usize;
                    Self::get_at(&children[index], path, offset + 1, used_nodes, bags)
                }
            }
        }
    }

    fn cow_insert(
        node_ref: &NodeRef,
        path: &Nibbles,
        offset: usize,
        value: Vec<u8>,
        used_nodes: &mut UsedNodes,
        bags: &BagChain<'_>,
    ) -> Result<NodeRef> {
        let node = match node_ref {
            NodeRef::Empty => {
                return Ok(NodeRef::from_node(MerkleNode::Leaf {
                    path: path.slice(offset),
                    value,
                }));
            }
            NodeRef::Node(node) => {
                Self::record(node, used_nodes);
                node.as_ref().clone()
            }
            NodeRef::Hash(hash) => Self::resolve(hash, bags, used_nodes)?,
        };

        match node {
            MerkleNode::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                let remaining = path.slice(offset);
                if remaining == leaf_path {
                    return Ok(NodeRef::from_node(MerkleNode::Leaf {
                        path: remaining,
                        value,
                    }));
                }
                let common = remaining.common_prefix_len(&leaf_path);
                let mut children: [NodeRef; 16] = core::array::from_fn(|_| NodeRef::Empty);
                let mut branch_value = None;

                let old_rest = leaf_path.slice(common);
                if old_rest.is_empty() {
                    branch_value = Some(leaf_value);
                } else {
                    children[old_rest.at(0) as usize] = NodeRef::from_node(MerkleNode::Leaf {
                        path: old_rest.slice(1),
                        value: leaf_value,
                    });
                }

                let new_rest = remaining.slice(common);
                if new_rest.is_empty() {
                    branch_value = Some(value);
                } else {
                    children[new_rest.at(0) as usize] = NodeRef::from_node(MerkleNode::Leaf {
                        path: new_rest.slice(1),
                        value,
                    });
                }

                let branch = NodeRef::from_node(MerkleNode::Branch {
                    children: Box::new(children),
                    value: branch_value,
                });
                Ok(Self::wrap_common(&remaining, common, branch))
            }

            MerkleNode::Extension {
                path: ext_path,
                child,
            } => {
                let remaining = path.slice(offset);
                let common = remaining.common_prefix_len(&ext_path);
                if common == ext_path.len() {
                    let new_child =
                        Self::cow_insert(&child, path, offset + common, value, used_nodes, bags)?;
                    return Ok(NodeRef::from_node(MerkleNode::Extension {
                        path: ext_path,
                        child: new_child,
                    }));
                }

                let mut children: [NodeRef; 16] = core::array::from_fn(|_| NodeRef::Empty);
                let mut branch_value = None;

                // Re-hang the shortened extension below the split point.
                let ext_rest = ext_path.slice(common);
                let ext_index = ext_rest.at(0) as usize;
                children[ext_index] = if ext_rest.len() == 1 {
                    child
                } else {
                    NodeRef::from_node(MerkleNode::Extension {
                        path: ext_rest.slice(1),
                        child,
                    })
                };

                let new_rest = remaining.slice(common);
                if new_rest.is_empty() {
                    branch_value = Some(value);
                } else {
                    children[new_rest.at(0) as usize] = NodeRef::from_node(MerkleNode::Leaf {
                        path: new_rest.slice(1),
                        value,
                    });
                }

                let branch = NodeRef::from_node(MerkleNode::Branch {
                    children: Box::new(children),
                    value: branch_value,
                });
                Ok(Self::wrap_common(&remaining, common, branch))
            }

            MerkleNode::Branch {
                mut children,
                value: branch_value,
            } => {
                if offset == path.len() {
                    return Ok(NodeRef::from_node(MerkleNode::Branch {
                        children,
                        value: Some(value),
                    }));
                }
                let index = path.at(offset) as usize;
                children[index] =
                    Self::cow_insert(&children[index], path, offset + 1, value, used_nodes, bags)?;
                Ok(NodeRef::from_node(MerkleNode::Branch {
                    children,
                    value: branch_value,
                }))
            }
        }
    }

    /// Wrap `inner` in an extension carrying the shared `common` prefix of
    /// `remaining`, if any.
    fn wrap_common(remaining: &Nibbles, common: usize, inner: NodeRef) -> NodeRef {
        if common > 0 {
            NodeRef::from_node(MerkleNode::Extension {
                path: remaining.slice_range(0, common),
                child: inner,
            })
        } else {
            inner
        }
    }
}
