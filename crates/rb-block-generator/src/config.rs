//! Configuration for block production.

use shared_types::Address;
use std::path::PathBuf;

/// Runtime configuration for the block generator.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Address credited as producer in proposed headers.
    pub beneficiary: Address,

    /// Lower bound on the simulated proof-of-stake delay, milliseconds.
    pub pow_min_ms: u64,

    /// Upper bound on the simulated proof-of-stake delay, milliseconds.
    pub pow_max_ms: u64,

    /// Cap on transactions gathered per block (`None` = unbounded).
    pub max_tx_per_block: Option<usize>,

    /// Trie cache depth retained across prunes.
    pub prune_depth: usize,

    /// Where to append the per-100-block throughput log (`None` disables).
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            beneficiary: [0u8; 20],
            pow_min_ms: 5_000,
            pow_max_ms: 12_000,
            max_tx_per_block: None,
            prune_depth: 6,
            checkpoint_path: None,
        }
    }
}
