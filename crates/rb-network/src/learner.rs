//! Learned-node tables and the learned-block index.
//!
//! Two node tables rotate at every block boundary: `current` collects what
//! peers advertise during this height, `previous` holds the last height's
//! table and serves as the fallback bag during fork re-execution. Learned
//! blocks are indexed by height; a block for the height currently being
//! produced additionally signals the generator's race through a bounded
//! channel.

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use shared_types::{keccak256, Block, Hash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Capacity of the block-arrival signal channel. Arrivals beyond this are
/// still indexed; only the wake-up signal is dropped, and the generator
/// re-checks the index at every height anyway.
const BLOCK_SIGNAL_CAPACITY: usize = 16;

/// Indexes peer-advertised trie nodes and blocks.
pub struct NetworkLearner {
    /// Nodes learned during the current height.
    current: RwLock<HashMap<Hash, Vec<u8>>>,
    /// Nodes learned during the previous height (fallback bag).
    previous: RwLock<HashMap<Hash, Vec<u8>>>,
    /// Peer blocks by height, filtered to heights we still care about.
    learned_blocks: Mutex<HashMap<u64, Block>>,
    /// The height the generator is currently producing.
    producing_height: AtomicU64,
    /// Wake-up signal carrying the height a peer block arrived for.
    block_signal: mpsc::Sender<u64>,
}

impl NetworkLearner {
    /// Create a learner together with the receiving half of the
    /// block-arrival signal (held by the block generator).
    pub fn new(producing_height: u64) -> (Arc<Self>, mpsc::Receiver<u64>) {
        let (block_signal, receiver) = mpsc::channel(BLOCK_SIGNAL_CAPACITY);
        let learner = Arc::new(Self {
            current: RwLock::new(HashMap::new()),
            previous: RwLock::new(HashMap::new()),
            learned_blocks: Mutex::new(HashMap::new()),
            producing_height: AtomicU64::new(producing_height),
            block_signal,
        });
        (learner, receiver)
    }

    /// Index an advertised trie node under its Keccak hash.
    pub fn learn_node(&self, bytes: Vec<u8>) -> Hash {
        let hash = keccak256(&bytes);
        trace!("[rb-net] learned node {}", hex::encode(&hash[..8]));
        self.current.write().insert(hash, bytes);
        hash
    }

    /// Index an advertised block and, when it lands on the height being
    /// produced, wake the generator's race.
    pub fn learn_block(&self, block: Block) {
        let number = block.header.number;
        let producing = self.producing_height.load(Ordering::SeqCst);
        if number < producing {
            debug!(
                "[rb-net] dropping stale peer block #{} (producing #{})",
                number, producing
            );
            return;
        }

        debug!("[rb-net] learned peer block #{}", number);
        self.learned_blocks.lock().insert(number, block);
        // try_send: a full signal channel only means the generator already
        // has wake-ups pending.
        let _ = self.block_signal.try_send(number);
    }

    /// Remove and return the learned block for `number`, if any.
    pub fn take_block(&self, number: u64) -> Option<Block> {
        self.learned_blocks.lock().remove(&number)
    }

    /// Advance the height filter and drop blocks below it.
    pub fn set_producing_height(&self, height: u64) {
        self.producing_height.store(height, Ordering::SeqCst);
        self.learned_blocks.lock().retain(|number, _| *number >= height);
    }

    /// Rotate the node tables at a block boundary:
    /// `previous <- current`, `current <- empty`.
    pub fn rotate_learned_nodes(&self) {
        let drained = std::mem::take(&mut *self.current.write());
        *self.previous.write() = drained;
    }

    /// Nodes learned during the current height.
    pub fn current_nodes(&self) -> RwLockReadGuard<'_, HashMap<Hash, Vec<u8>>> {
        self.current.read()
    }

    /// Nodes learned during the previous height.
    pub fn previous_nodes(&self) -> RwLockReadGuard<'_, HashMap<Hash, Vec<u8>>> {
        self.previous.read()
    }
}
