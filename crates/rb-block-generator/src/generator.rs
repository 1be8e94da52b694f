//! The per-height block production state machine.

use crate::checkpoint::CheckpointLog;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use primitive_types::U256;
use rand::Rng;
use rb_execution::{ExecutionEngine, ExecutionResult};
use rb_network::{NetworkLearner, NeighborSet};
use rb_state_trie::CachedTrie;
use rb_storage_shards::{build_update_messages, ShardPool};
use shared_types::{
    keccak256, Block, BlockHeader, Hash, Transaction, TransactionData, TransactionQueue,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How the race for one height resolved.
enum RaceOutcome {
    /// Our proof-of-stake timer fired first.
    Timer,
    /// A peer block for this height arrived first.
    Peer(Block),
}

/// The block generator: one instance drives the verifier's chain.
pub struct BlockGenerator {
    config: GeneratorConfig,
    engine: ExecutionEngine,
    queue: Arc<TransactionQueue>,
    learner: Arc<NetworkLearner>,
    peer_blocks: mpsc::Receiver<u64>,
    neighbors: NeighborSet,
    shards: ShardPool,
    checkpoint: Option<CheckpointLog>,
    running: Arc<AtomicBool>,

    // Per-height chain state.
    tree: CachedTrie,
    block_number: u64,
    parent_hash: Hash,
    difficulty: U256,
    gas_limit: U256,
}

impl BlockGenerator {
    /// Build a generator anchored on an adopted (usually genesis) header
    /// and the trie matching its state root.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: GeneratorConfig,
        engine: ExecutionEngine,
        queue: Arc<TransactionQueue>,
        learner: Arc<NetworkLearner>,
        peer_blocks: mpsc::Receiver<u64>,
        neighbors: NeighborSet,
        shards: ShardPool,
        anchor: &BlockHeader,
        tree: CachedTrie,
        running: Arc<AtomicBool>,
    ) -> Self {
        let checkpoint = config
            .checkpoint_path
            .clone()
            .map(CheckpointLog::new);
        Self {
            block_number: anchor.number + 1,
            parent_hash: anchor.hash(),
            difficulty: anchor.difficulty,
            gas_limit: anchor.gas_limit,
            config,
            engine,
            queue,
            learner,
            peer_blocks,
            neighbors,
            shards,
            checkpoint,
            running,
            tree,
        }
    }

    /// The height currently being produced.
    pub fn producing_height(&self) -> u64 {
        self.block_number
    }

    /// Root hash of the live state trie.
    pub fn state_root(&self) -> Hash {
        self.tree.root_hash()
    }

    /// Loop until [`GeneratorConfig`]'s owner clears the running flag. The
    /// flag is only checked between heights: an in-flight block always
    /// completes.
    pub async fn run(&mut self) -> Result<()> {
        info!("[rb-gen] block generator starting at height {}", self.block_number);
        while self.running.load(Ordering::SeqCst) {
            self.produce_height().await?;
        }
        info!("[rb-gen] block generator stopped before height {}", self.block_number);
        Ok(())
    }

    /// Produce exactly one height: propose or adopt, then advance.
    pub async fn produce_height(&mut self) -> Result<()> {
        self.learner.set_producing_height(self.block_number);

        // Shortcut adoption: a peer already produced this height.
        if let Some(peer) = self.learner.take_block(self.block_number) {
            self.adopt(peer, Vec::new());
            return Ok(());
        }

        // Gather and execute.
        let mut batch = self.queue.drain(self.config.max_tx_per_block);
        let exec = {
            let current = self.learner.current_nodes();
            let previous = self.learner.previous_nodes();
            self.engine
                .order_and_execute(&mut batch, &self.tree, &current, &previous, false)?
        };

        // Transactions root: auxiliary trie keyed by the ASCII decimal
        // index of each included transaction.
        let included: Vec<Vec<u8>> = exec
            .order
            .iter()
            .map(|&index| batch[index].tx_binary.clone())
            .collect();
        let transactions_root = CachedTrie::from_entries(
            included
                .iter()
                .enumerate()
                .map(|(index, binary)| (index.to_string().into_bytes(), binary.clone())),
        )
        .root_hash();

        let header = BlockHeader {
            parent_hash: self.parent_hash,
            uncle_hash: [0u8; 32],
            beneficiary: self.config.beneficiary,
            state_root: exec.state_root,
            transactions_root,
            receipts_root: [0u8; 32],
            logs_bloom: [0u8; 256],
            difficulty: self.difficulty,
            number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: U256::from(exec.gas_used),
            timestamp: exec.timestamp,
            extra_data: b"rainblock".to_vec(),
            mix_hash: [0u8; 32],
            nonce: [0u8; 8],
        };

        // Execution has decided every transaction's fate; tell the
        // clients while the race runs.
        for record in batch.iter_mut() {
            record.send_reply();
        }

        match self.race().await {
            RaceOutcome::Timer => self.propose(header, included, exec).await?,
            RaceOutcome::Peer(peer) => self.adopt(peer, batch),
        }
        Ok(())
    }

    /// Wait for whichever happens first: the proof-of-stake delay elapses
    /// or the learner signals a peer block for this height.
    async fn race(&mut self) -> RaceOutcome {
        let learner = Arc::clone(&self.learner);
        let height = self.block_number;
        let timer = tokio::time::sleep(self.pos_delay());
        tokio::pin!(timer);
        let signals = &mut self.peer_blocks;

        loop {
            tokio::select! {
                biased;
                arrival = signals.recv() => match arrival {
                    Some(number) if number == height => {
                        if let Some(block) = learner.take_block(number) {
                            return RaceOutcome::Peer(block);
                        }
                    }
                    Some(_) => {
                        // A future height; it stays indexed for later.
                    }
                    None => {
                        timer.as_mut().await;
                        return RaceOutcome::Timer;
                    }
                },
                _ = &mut timer => return RaceOutcome::Timer,
            }
        }
    }

    /// Uniform random delay simulating proof-of-stake block timing.
    fn pos_delay(&self) -> Duration {
        let low = self.config.pow_min_ms.min(self.config.pow_max_ms);
        let high = self.config.pow_min_ms.max(self.config.pow_max_ms);
        let millis = if low == high {
            low
        } else {
            rand::thread_rng().gen_range(low..=high)
        };
        Duration::from_millis(millis)
    }

    /// We won the race: commit to the shards, gossip, advance.
    async fn propose(
        &mut self,
        header: BlockHeader,
        included: Vec<Vec<u8>>,
        exec: ExecutionResult,
    ) -> Result<()> {
        let included_count = included.len();
        let block = Block {
            header,
            transactions: included,
        };
        let rlp_block = block.rlp_encode();

        // Every node used during execution is re-advertised so neighbors
        // can verify the block statelessly. A recorded hash that does not
        // match its bytes means the engine state is corrupt.
        let mut node_bytes = Vec::with_capacity(exec.used_nodes.len());
        for (hash, bytes) in &exec.used_nodes {
            if keccak256(bytes) != *hash {
                return Err(GeneratorError::Internal(format!(
                    "used node {} does not hash to its bytes",
                    hex::encode(hash)
                )));
            }
            node_bytes.push(bytes.clone());
        }

        let root_node = exec.new_tree.root_node_serialized();
        let messages = build_update_messages(&rlp_block, &root_node, &exec.write_set);
        self.shards.update_all(messages).await?;

        self.neighbors.advertise_block_to_neighbors(rlp_block);
        self.neighbors.advertise_nodes_to_neighbors(node_bytes);

        self.learner.rotate_learned_nodes();
        self.parent_hash = block.header.hash();
        self.tree = exec.new_tree;

        info!(
            "[rb-gen] ⛏️  proposed block #{} | {} txs | state {}",
            block.header.number,
            included_count,
            hex::encode(&block.header.state_root[..8])
        );
        self.block_number += 1;

        if let Some(checkpoint) = &mut self.checkpoint {
            checkpoint.record_block(included_count, exec.execution_time);
        }
        self.tree.prune_state_cache(self.config.prune_depth);
        Ok(())
    }

    /// A peer won (or already owned) this height: re-execute their block
    /// in verify mode against the learned node pool and adopt it. The
    /// gathered batch goes back to the front of the queue for the next
    /// height either way.
    fn adopt(&mut self, peer: Block, requeue: Vec<TransactionData>) {
        let number = peer.header.number;
        if !requeue.is_empty() {
            self.queue.requeue_front(requeue);
        }

        let mut records = Vec::with_capacity(peer.transactions.len());
        for binary in &peer.transactions {
            match Transaction::decode(binary) {
                Ok(tx) => records.push(TransactionData::synthetic(tx, binary.clone())),
                Err(err) => {
                    warn!(
                        "[rb-gen] rejecting peer block #{}: undecodable transaction: {}",
                        number, err
                    );
                    return;
                }
            }
        }

        let exec = {
            let current = self.learner.current_nodes();
            let previous = self.learner.previous_nodes();
            match self
                .engine
                .order_and_execute(&mut records, &self.tree, &current, &previous, true)
            {
                Ok(exec) => exec,
                Err(err) => {
                    warn!("[rb-gen] rejecting peer block #{}: {}", number, err);
                    return;
                }
            }
        };

        if exec.order.len() != records.len() {
            warn!(
                "[rb-gen] rejecting peer block #{}: {}/{} transactions failed re-execution",
                number,
                records.len() - exec.order.len(),
                records.len()
            );
            return;
        }
        if exec.state_root != peer.header.state_root {
            warn!(
                "[rb-gen] rejecting peer block #{}: state root mismatch ({} != {})",
                number,
                hex::encode(&exec.state_root[..8]),
                hex::encode(&peer.header.state_root[..8])
            );
            return;
        }

        self.learner.rotate_learned_nodes();
        self.parent_hash = peer.header.hash();
        self.tree = exec.new_tree;
        self.block_number = number + 1;

        info!(
            "[rb-gen] adopted peer block #{} | {} txs | state {}",
            number,
            records.len(),
            hex::encode(&peer.header.state_root[..8])
        );
        debug!("[rb-gen] now producing height {}", self.block_number);

        if let Some(checkpoint) = &mut self.checkpoint {
            checkpoint.record_block(records.len(), exec.execution_time);
        }
        self.tree.prune_state_cache(self.config.prune_depth);
    }
}
