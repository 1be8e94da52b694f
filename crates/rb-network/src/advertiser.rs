//! Fire-and-forget advertisement to neighbor verifiers.
//!
//! The transport behind a neighbor is a port: the runtime wires in the
//! framed TCP client, tests wire in recording stubs. Advertisement never
//! blocks block production; each send runs on its own task and failures
//! are logged, not propagated.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Outbound transport to one neighbor verifier.
#[async_trait]
pub trait NeighborTransport: Send + Sync {
    /// Human-readable peer identity for logs.
    fn peer(&self) -> String;

    /// Stream a batch of RLP-encoded trie nodes to the neighbor.
    async fn advertise_nodes(&self, nodes: Vec<Vec<u8>>) -> Result<()>;

    /// Stream an RLP-encoded block to the neighbor.
    async fn advertise_block(&self, block: Vec<u8>) -> Result<()>;
}

/// The set of neighbor verifiers this node gossips to.
#[derive(Clone, Default)]
pub struct NeighborSet {
    neighbors: Vec<Arc<dyn NeighborTransport>>,
}

impl NeighborSet {
    pub fn new(neighbors: Vec<Arc<dyn NeighborTransport>>) -> Self {
        Self { neighbors }
    }

    /// A set with nobody to talk to (single-verifier deployments).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Advertise the trie nodes used by a produced block. Fire-and-forget.
    pub fn advertise_nodes_to_neighbors(&self, nodes: Vec<Vec<u8>>) {
        if nodes.is_empty() {
            return;
        }
        for neighbor in &self.neighbors {
            let neighbor = Arc::clone(neighbor);
            let nodes = nodes.clone();
            tokio::spawn(async move {
                if let Err(err) = neighbor.advertise_nodes(nodes).await {
                    warn!(
                        "[rb-net] node advertisement to {} failed: {}",
                        neighbor.peer(),
                        err
                    );
                }
            });
        }
    }

    /// Advertise a produced block. Fire-and-forget.
    pub fn advertise_block_to_neighbors(&self, block: Vec<u8>) {
        for neighbor in &self.neighbors {
            let neighbor = Arc::clone(neighbor);
            let block = block.clone();
            tokio::spawn(async move {
                if let Err(err) = neighbor.advertise_block(block).await {
                    warn!(
                        "[rb-net] block advertisement to {} failed: {}",
                        neighbor.peer(),
                        err
                    );
                }
            });
        }
    }
}
