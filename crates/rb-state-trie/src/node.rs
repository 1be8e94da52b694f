//! Trie node types and their RLP wire form.
//!
//! A child reference inside the cached trie is either a fully resident
//! node or a bare hash stub. On the wire (witnesses, peer advertisements,
//! shard reanchor payloads) children are always referenced by their
//! 32-byte Keccak hash, so a decoded node never embeds a subtree.

use crate::nibbles::Nibbles;
use rlp::{DecoderError, Rlp, RlpStream};
use shared_types::{keccak256, Hash, EMPTY_TRIE_ROOT};
use std::sync::Arc;

/// Reference to a child node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRef {
    /// No child.
    Empty,
    /// Hash-only stub: the node lives below the prune boundary or has not
    /// been learned yet.
    Hash(Hash),
    /// Resident node. `Arc` so a copy-on-write rebuild shares unchanged
    /// subtrees with its predecessor.
    Node(Arc<MerkleNode>),
}

impl NodeRef {
    /// Hash of the referenced node (`EMPTY_TRIE_ROOT` for no child).
    pub fn hash(&self) -> Hash {
        match self {
            NodeRef::Empty => EMPTY_TRIE_ROOT,
            NodeRef::Hash(hash) => *hash,
            NodeRef::Node(node) => node.hash(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Wrap an owned node.
    pub fn from_node(node: MerkleNode) -> Self {
        NodeRef::Node(Arc::new(node))
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        NodeRef::Empty
    }
}

/// The three resident node types of the Merkle-Patricia trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MerkleNode {
    /// Terminal node: remaining key path + value.
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Shared prefix optimization node.
    Extension { path: Nibbles, child: NodeRef },

    /// 16-way branch with an optional value for keys terminating here.
    Branch {
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl MerkleNode {
    /// An all-empty branch.
    pub fn empty_branch() -> Self {
        MerkleNode::Branch {
            children: Box::new(core::array::from_fn(|_| NodeRef::Empty)),
            value: None,
        }
    }

    /// RLP-encode with children referenced by hash.
    pub fn rlp_encode(&self) -> Vec<u8> {
        match self {
            MerkleNode::Leaf { path, value } => {
                let mut s = RlpStream::new_list(2);
                s.append(&path.encode_hex_prefix(true));
                s.append(value);
                s.out().to_vec()
            }
            MerkleNode::Extension { path, child } => {
                let mut s = RlpStream::new_list(2);
                s.append(&path.encode_hex_prefix(false));
                s.append(&child.hash().to_vec());
                s.out().to_vec()
            }
            MerkleNode::Branch { children, value } => {
                let mut s = RlpStream::new_list(17);
                for child in children.iter() {
                    if child.is_empty() {
                        s.append_empty_data();
                    } else {
                        s.append(&child.hash().to_vec());
                    }
                }
                match value {
                    Some(value) => s.append(value),
                    None => s.append_empty_data(),
                };
                s.out().to_vec()
            }
        }
    }

    /// Keccak-256 of the RLP encoding.
    pub fn hash(&self) -> Hash {
        keccak256(&self.rlp_encode())
    }
}

/// Decode an advertised or witnessed node from its RLP bytes.
///
/// Child references decode to hash stubs; resolution happens lazily
/// through the bag chain during traversal.
pub fn rlp_to_merkle_node(bytes: &[u8]) -> Result<MerkleNode, DecoderError> {
    let rlp = Rlp::new(bytes);
    if !rlp.is_list() {
        return Err(DecoderError::Custom("trie node is not a list"));
    }
    match rlp.item_count()? {
        2 => {
            let encoded_path: Vec<u8> = rlp.val_at(0)?;
            let (path, is_leaf) = Nibbles::decode_hex_prefix(&encoded_path);
            if is_leaf {
                Ok(MerkleNode::Leaf {
                    path,
                    value: rlp.val_at(1)?,
                })
            } else {
                let child: Hash = rlp
                    .val_at::<Vec<u8>>(1)?
                    .try_into()
                    .map_err(|_| DecoderError::Custom("extension child is not a hash"))?;
                Ok(MerkleNode::Extension {
                    path,
                    child: NodeRef::Hash(child),
                })
            }
        }
        17 => {
            let mut children: [NodeRef; 16] = core::array::from_fn(|_| NodeRef::Empty);
            for (i, slot) in children.iter_mut().enumerate() {
                let data = rlp.at(i)?.data()?;
                *slot = match data.len() {
                    0 => NodeRef::Empty,
                    32 => {
                        let mut hash = [0u8; 32];
                        hash.copy_from_slice(data);
                        NodeRef::Hash(hash)
                    }
                    _ => {
                        return Err(DecoderError::Custom(
                            "branch child is neither empty nor a hash",
                        ))
                    }
                };
            }
            let value_bytes = rlp.at(16)?.data()?;
            let value = if value_bytes.is_empty() {
                None
            } else {
                Some(value_bytes.to_vec())
            };
            Ok(MerkleNode::Branch {
                children: Box::new(children),
                value,
            })
        }
        _ => Err(DecoderError::Custom("trie node is neither 2 nor 17 items")),
    }
}
