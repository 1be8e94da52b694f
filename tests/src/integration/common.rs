//! Shared fixtures: a fully wired single verifier with recording shards.

use primitive_types::U256;
use rb_block_generator::{BlockGenerator, GeneratorConfig};
use rb_execution::{ExecutionConfig, ExecutionEngine};
use rb_network::{NeighborSet, NetworkLearner};
use rb_state_trie::CachedTrie;
use rb_storage_shards::{shard_index, RecordingShardClient};
use rb_verifier_api::VerifierApi;
use secp256k1::SecretKey;
use shared_types::{
    hash_address, sign_transaction, Account, Address, BlockHeader, Hash, Transaction,
    TransactionQueue, EMPTY_TRIE_ROOT,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A wired verifier: API surface, generator, and recording shards.
pub struct TestNode {
    pub api: Arc<VerifierApi>,
    pub generator: BlockGenerator,
    pub queue: Arc<TransactionQueue>,
    pub learner: Arc<NetworkLearner>,
    pub shards: Vec<Arc<RecordingShardClient>>,
}

/// Deterministic test key.
pub fn secret(tag: u8) -> SecretKey {
    SecretKey::from_slice(&[tag; 32]).unwrap()
}

/// Address controlled by `secret`.
pub fn address_of(key: &SecretKey) -> Address {
    let binary = sign_transaction(
        U256::zero(),
        U256::one(),
        U256::from(21_000u64),
        Some([0u8; 20]),
        U256::zero(),
        &[],
        None,
        key,
    );
    Transaction::decode(&binary).unwrap().from
}

/// Sign a transfer as raw transaction bytes.
pub fn transfer(key: &SecretKey, nonce: u64, to: Option<Address>, value: u64) -> Vec<u8> {
    sign_transaction(
        U256::from(nonce),
        U256::one(),
        U256::from(21_000u64),
        to,
        U256::from(value),
        &[],
        None,
        key,
    )
}

/// Build a resident trie holding (address, nonce, balance) accounts.
pub fn state_trie(accounts: &[(Address, u64, u64)]) -> CachedTrie {
    CachedTrie::from_entries(accounts.iter().map(|(address, nonce, balance)| {
        (
            hash_address(address).to_vec(),
            Account::new(U256::from(*nonce), U256::from(*balance)).rlp_encode(),
        )
    }))
}

/// Genesis header anchoring `state_root` at height 0.
pub fn anchor_header(state_root: Hash) -> BlockHeader {
    BlockHeader {
        parent_hash: [0u8; 32],
        uncle_hash: [0u8; 32],
        beneficiary: [0u8; 20],
        state_root,
        transactions_root: EMPTY_TRIE_ROOT,
        receipts_root: [0u8; 32],
        logs_bloom: [0u8; 256],
        difficulty: U256::one(),
        number: 0,
        gas_limit: U256::from(10_000_000u64),
        gas_used: U256::zero(),
        timestamp: 0,
        extra_data: b"rainblock".to_vec(),
        mix_hash: [0u8; 32],
        nonce: [0u8; 8],
    }
}

/// Wire up a verifier over `accounts` with a fixed PoS delay.
pub fn test_node(accounts: &[(Address, u64, u64)], pow_ms: u64) -> TestNode {
    let tree = state_trie(accounts);
    let anchor = anchor_header(tree.root_hash());

    let queue = Arc::new(TransactionQueue::new());
    let (learner, peer_blocks) = NetworkLearner::new(anchor.number + 1);
    let api = Arc::new(VerifierApi::new(
        Arc::clone(&queue),
        Arc::clone(&learner),
        [0xBE; 20],
        "rainblock-verifier/test",
    ));

    let (pool, shards) = RecordingShardClient::pool();
    let generator = BlockGenerator::new(
        GeneratorConfig {
            beneficiary: [0xBE; 20],
            pow_min_ms: pow_ms,
            pow_max_ms: pow_ms,
            max_tx_per_block: None,
            prune_depth: 4,
            checkpoint_path: None,
        },
        ExecutionEngine::new(ExecutionConfig::default()),
        Arc::clone(&queue),
        Arc::clone(&learner),
        peer_blocks,
        NeighborSet::empty(),
        pool,
        &anchor,
        tree,
        Arc::new(AtomicBool::new(true)),
    );

    TestNode {
        api,
        generator,
        queue,
        learner,
        shards,
    }
}

/// Brute-force a key whose address hashes onto `shard`.
pub fn key_on_shard(shard: usize) -> SecretKey {
    for tag in 1u8..=255 {
        let key = secret(tag);
        if shard_index(&hash_address(&address_of(&key))) == shard {
            return key;
        }
    }
    panic!("no test key found for shard {shard}");
}

/// Brute-force a plain address that hashes onto `shard`.
pub fn address_on_shard(shard: usize) -> Address {
    for i in 0u32..100_000 {
        let mut address = [0u8; 20];
        address[..4].copy_from_slice(&i.to_be_bytes());
        if shard_index(&hash_address(&address)) == shard {
            return address;
        }
    }
    panic!("no address found for shard {shard}");
}

/// The one update a recording shard received, if any.
pub fn single_update(
    shard: &RecordingShardClient,
) -> Option<rb_storage_shards::UpdateMsg> {
    let updates = shard.updates();
    assert!(updates.len() <= 1, "expected at most one update per shard");
    updates.into_iter().next()
}
