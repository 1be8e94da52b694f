//! Verifier configuration, loaded from a TOML file.
//!
//! Paths in the file (genesis block, genesis data) resolve relative to the
//! directory containing the configuration file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shared_types::Address;
use std::path::{Path, PathBuf};

/// Complete verifier configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifierConfig {
    /// Hex-encoded 20-byte miner address credited in produced headers.
    pub beneficiary: String,

    /// Path to the RLP-encoded genesis block.
    pub genesis_block: Option<PathBuf>,

    /// Path to the JSON account dump for genesis state (optionally
    /// gzip-compressed).
    pub genesis_data: Option<PathBuf>,

    /// Per-shard host lists, one entry per shard index `0..16`. Empty
    /// means run against in-process recording shards (bring-up mode).
    #[serde(default)]
    pub storage: Vec<Vec<String>>,

    /// RPC surface settings.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Lower bound on the simulated proof-of-stake delay, milliseconds.
    #[serde(default = "default_pow_min")]
    pub pow_min: u64,

    /// Upper bound on the simulated proof-of-stake delay, milliseconds.
    #[serde(default = "default_pow_max")]
    pub pow_max: u64,

    /// Cap on transactions per block (unset = unbounded).
    pub max_tx_per_block: Option<usize>,

    /// Trie cache depth retained across prunes.
    #[serde(default = "default_prune_depth")]
    pub prune_depth: usize,

    /// Unify all per-transaction witnesses into one bag per height.
    #[serde(default)]
    pub share_bag: bool,

    /// Synthesize absent sender accounts.
    #[serde(default)]
    pub generate_from_accounts: bool,

    /// Skip sender-nonce equality enforcement.
    #[serde(default)]
    pub disable_nonce_check: bool,

    /// Addresses of neighbor verifiers to gossip with.
    #[serde(default)]
    pub neighbors: Vec<String>,

    /// Throughput log location (unset = alongside the config file).
    pub checkpoint_path: Option<PathBuf>,
}

/// RPC surface settings.
#[derive(Clone, Debug, Deserialize)]
pub struct RpcConfig {
    /// Bind address for the verifier wire protocol.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Milliseconds to wait for a shard connection before failing startup.
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            storage_timeout: default_storage_timeout(),
        }
    }
}

fn default_pow_min() -> u64 {
    5_000
}

fn default_pow_max() -> u64 {
    12_000
}

fn default_prune_depth() -> usize {
    6
}

fn default_listen() -> String {
    "127.0.0.1:9545".to_string()
}

fn default_storage_timeout() -> u64 {
    5_000
}

impl VerifierConfig {
    /// Load from a TOML file, resolving relative paths against its
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: VerifierConfig =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.genesis_block = config.genesis_block.map(|p| resolve(base, p));
        config.genesis_data = config.genesis_data.map(|p| resolve(base, p));
        config.checkpoint_path = config.checkpoint_path.map(|p| resolve(base, p));
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pow_min > self.pow_max {
            bail!(
                "pow_min ({}) exceeds pow_max ({})",
                self.pow_min,
                self.pow_max
            );
        }
        if !self.storage.is_empty() && self.storage.len() != 16 {
            bail!("storage must list 16 shards, got {}", self.storage.len());
        }
        self.beneficiary_address()?;
        Ok(())
    }

    /// Decode the configured beneficiary address.
    pub fn beneficiary_address(&self) -> Result<Address> {
        let raw = self.beneficiary.trim_start_matches("0x");
        let bytes = hex::decode(raw).context("beneficiary is not hex")?;
        bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("beneficiary must be 20 bytes"))
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
