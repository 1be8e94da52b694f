//! Submission-to-commit scenarios through the full wiring.

use super::common::*;
use rb_state_trie::CachedTrie;
use rb_verifier_api::TransactionRequest;
use shared_types::{Block, ErrorCode, EMPTY_TRIE_ROOT};
use std::sync::Arc;

/// Submit raw transaction bytes through the API on a background task.
fn submit(
    node: &TestNode,
    transaction: Vec<u8>,
) -> tokio::task::JoinHandle<rb_verifier_api::TransactionReply> {
    let api = Arc::clone(&node.api);
    tokio::spawn(async move {
        api.submit_transaction(TransactionRequest {
            transaction,
            account_witnesses: vec![],
        })
        .await
    })
}

/// Wait until the queue holds `count` records.
async fn queued(node: &TestNode, count: usize) {
    for _ in 0..100 {
        if node.queue.len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("queue never reached {count} records");
}

#[tokio::test]
async fn simple_transfer_commits_and_replies_success() {
    let key = secret(1);
    let sender = address_of(&key);
    let recipient = [0xBB; 20];
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 10);

    let binary = transfer(&key, 0, Some(recipient), 40);
    let reply = submit(&node, binary.clone());
    queued(&node, 1).await;

    node.generator.produce_height().await.unwrap();

    assert_eq!(reply.await.unwrap().code, ErrorCode::Success);
    assert_eq!(node.generator.producing_height(), 2);

    // Post-state: A = (1, 60), B = (0, 40), and the root moved.
    let expected = state_trie(&[(sender, 1, 60), (recipient, 0, 40)]);
    assert_eq!(node.generator.state_root(), expected.root_hash());
    assert_ne!(
        node.generator.state_root(),
        state_trie(&[(sender, 0, 100), (recipient, 0, 0)]).root_hash()
    );

    // The committed block carries the transaction under decimal index "0".
    let update = single_update(&node.shards[0]).expect("shard 0 got the block");
    let block = Block::rlp_decode(&update.rlp_block).unwrap();
    assert_eq!(block.transactions, vec![binary.clone()]);
    let expected_tx_root = CachedTrie::from_entries([(b"0".to_vec(), binary)]).root_hash();
    assert_eq!(block.header.transactions_root, expected_tx_root);
}

#[tokio::test]
async fn stale_nonce_is_rejected_and_state_unchanged() {
    let key = secret(2);
    let sender = address_of(&key);
    let recipient = [0xBB; 20];
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 10);
    let genesis_root = node.generator.state_root();

    let reply = submit(&node, transfer(&key, 5, Some(recipient), 40));
    queued(&node, 1).await;
    node.generator.produce_height().await.unwrap();

    assert_eq!(reply.await.unwrap().code, ErrorCode::Invalid);
    assert_eq!(node.generator.state_root(), genesis_root);

    // The block went out empty, with the empty transactions root.
    let update = single_update(&node.shards[0]).unwrap();
    let block = Block::rlp_decode(&update.rlp_block).unwrap();
    assert!(block.transactions.is_empty());
    assert_eq!(block.header.transactions_root, EMPTY_TRIE_ROOT);
}

#[tokio::test]
async fn absent_recipient_is_created_by_the_transfer() {
    let key = secret(3);
    let sender = address_of(&key);
    let recipient = [0xCD; 20];
    let mut node = test_node(&[(sender, 0, 100)], 10);

    let reply = submit(&node, transfer(&key, 0, Some(recipient), 40));
    queued(&node, 1).await;
    node.generator.produce_height().await.unwrap();

    assert_eq!(reply.await.unwrap().code, ErrorCode::Success);
    let expected = state_trie(&[(sender, 1, 60), (recipient, 0, 40)]);
    assert_eq!(node.generator.state_root(), expected.root_hash());
}

#[tokio::test]
async fn contract_creation_is_rejected() {
    let key = secret(4);
    let sender = address_of(&key);
    let mut node = test_node(&[(sender, 0, 100)], 10);
    let genesis_root = node.generator.state_root();

    let reply = submit(&node, transfer(&key, 0, None, 0));
    queued(&node, 1).await;
    node.generator.produce_height().await.unwrap();

    assert_eq!(reply.await.unwrap().code, ErrorCode::Invalid);
    assert_eq!(node.generator.state_root(), genesis_root);
}

#[tokio::test]
async fn undecodable_submission_replies_invalid_without_queueing() {
    let key = secret(5);
    let node = test_node(&[(address_of(&key), 0, 100)], 10);

    let reply = node
        .api
        .submit_transaction(TransactionRequest {
            transaction: vec![0xba, 0xad],
            account_witnesses: vec![],
        })
        .await;
    assert_eq!(reply.code, ErrorCode::Invalid);
    assert!(node.queue.is_empty());
}

#[tokio::test]
async fn consecutive_heights_chain_transfers() {
    let key = secret(6);
    let sender = address_of(&key);
    let recipient = [0xBB; 20];
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 10);

    let first = submit(&node, transfer(&key, 0, Some(recipient), 10));
    queued(&node, 1).await;
    node.generator.produce_height().await.unwrap();
    assert_eq!(first.await.unwrap().code, ErrorCode::Success);

    let second = submit(&node, transfer(&key, 1, Some(recipient), 20));
    queued(&node, 1).await;
    node.generator.produce_height().await.unwrap();
    assert_eq!(second.await.unwrap().code, ErrorCode::Success);

    assert_eq!(node.generator.producing_height(), 3);
    let expected = state_trie(&[(sender, 2, 70), (recipient, 0, 30)]);
    assert_eq!(node.generator.state_root(), expected.root_hash());
}
