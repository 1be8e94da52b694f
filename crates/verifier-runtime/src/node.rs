//! Wiring: construct every subsystem from the configuration and hand
//! control to the block generator loop.

use crate::config::VerifierConfig;
use crate::genesis;
use anyhow::{bail, Context, Result};
use rb_block_generator::{BlockGenerator, GeneratorConfig};
use rb_execution::{ExecutionConfig, ExecutionEngine};
use rb_network::{NeighborSet, NeighborTransport, NetworkLearner};
use rb_state_trie::CachedTrie;
use rb_storage_shards::{
    RecordingShardClient, ShardClient, ShardPool, TcpShardClient, SHARD_COUNT,
};
use rb_verifier_api::{TcpNeighbor, VerifierApi, VerifierServer};
use shared_types::TransactionQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bring the verifier up and run it until interrupted.
pub async fn run_node(config: VerifierConfig) -> Result<()> {
    let beneficiary = config.beneficiary_address()?;

    // Genesis state and anchor block.
    let mut tree = match &config.genesis_data {
        Some(path) => genesis::load_genesis_state(path)?,
        None => {
            warn!("[runtime] no genesis data configured, starting from an empty state");
            CachedTrie::new()
        }
    };
    tree.prune_state_cache(config.prune_depth);

    let anchor = match &config.genesis_block {
        Some(path) => genesis::load_genesis_block(path)?.header,
        None => genesis::default_anchor(tree.root_hash()),
    };
    if tree.root_hash() != anchor.state_root {
        bail!(
            "genesis state root {} does not match genesis header {}",
            hex::encode(tree.root_hash()),
            hex::encode(anchor.state_root)
        );
    }
    info!(
        "[runtime] genesis anchored at #{} state {}",
        anchor.number,
        hex::encode(&anchor.state_root[..8])
    );

    // Storage shards: connect and preflight before anything else runs.
    let shards = build_shard_pool(&config)?;
    shards
        .preflight(Duration::from_millis(config.rpc.storage_timeout))
        .await
        .context("storage shard preflight")?;

    // Shared structures and the RPC surface.
    let queue = Arc::new(TransactionQueue::new());
    let (learner, peer_blocks) = NetworkLearner::new(anchor.number + 1);
    let api = Arc::new(VerifierApi::new(
        Arc::clone(&queue),
        Arc::clone(&learner),
        beneficiary,
        crate::VERSION,
    ));
    let listener = TcpListener::bind(&config.rpc.listen)
        .await
        .with_context(|| format!("binding {}", config.rpc.listen))?;
    tokio::spawn(VerifierServer::new(api).serve(listener));

    let neighbors = NeighborSet::new(
        config
            .neighbors
            .iter()
            .map(|address| Arc::new(TcpNeighbor::new(address.clone())) as Arc<dyn NeighborTransport>)
            .collect(),
    );
    info!("[runtime] gossiping with {} neighbors", neighbors.len());

    // The generator owns the chain state from here on.
    let running = Arc::new(AtomicBool::new(true));
    let generator_config = GeneratorConfig {
        beneficiary,
        pow_min_ms: config.pow_min,
        pow_max_ms: config.pow_max,
        max_tx_per_block: config.max_tx_per_block,
        prune_depth: config.prune_depth,
        checkpoint_path: config.checkpoint_path.clone(),
    };
    let engine = ExecutionEngine::new(ExecutionConfig {
        share_bag: config.share_bag,
        generate_from_accounts: config.generate_from_accounts,
        disable_nonce_check: config.disable_nonce_check,
    });
    let mut generator = BlockGenerator::new(
        generator_config,
        engine,
        queue,
        learner,
        peer_blocks,
        neighbors,
        shards,
        &anchor,
        tree,
        Arc::clone(&running),
    );

    // Cooperative shutdown: the loop exits at the next height boundary.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("[runtime] interrupt received, stopping after the current height");
            running.store(false, Ordering::SeqCst);
        }
    });

    generator.run().await?;
    info!("[runtime] shut down cleanly");
    Ok(())
}

/// Build the 16-shard pool from configuration, or an in-process recording
/// pool when no shard hosts are configured.
fn build_shard_pool(config: &VerifierConfig) -> Result<ShardPool> {
    if config.storage.is_empty() {
        warn!("[runtime] no storage shards configured, using in-process recording shards");
        return Ok(RecordingShardClient::pool().0);
    }

    let mut clients: Vec<Arc<dyn ShardClient>> = Vec::with_capacity(SHARD_COUNT);
    for (shard, hosts) in config.storage.iter().enumerate() {
        let host = hosts
            .first()
            .with_context(|| format!("shard {shard} has no hosts"))?;
        clients.push(Arc::new(TcpShardClient::new(shard, host.clone())));
    }
    ShardPool::new(clients).context("building shard pool")
}
