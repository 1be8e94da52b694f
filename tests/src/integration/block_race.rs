//! Peer-block arrival racing local production.

use super::common::*;
use rb_verifier_api::{BlockAdvertisement, TransactionRequest};
use shared_types::{Block, ErrorCode};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn advertised_peer_block_wins_the_race_and_batch_retries() {
    let key = secret(10);
    let sender = address_of(&key);
    let recipient = [0xBB; 20];
    // A very slow local timer: the peer always wins this height.
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 2_000);
    let genesis_root = node.generator.state_root();

    let reply = {
        let api = Arc::clone(&node.api);
        let binary = transfer(&key, 0, Some(recipient), 40);
        tokio::spawn(async move {
            api.submit_transaction(TransactionRequest {
                transaction: binary,
                account_witnesses: vec![],
            })
            .await
        })
    };
    while node.queue.is_empty() {
        tokio::task::yield_now().await;
    }

    // A peer proposes an empty block over the same parent state and
    // advertises it mid-race.
    let mut peer_header = anchor_header(genesis_root);
    peer_header.number = 1;
    let peer = Block {
        header: peer_header,
        transactions: vec![],
    };
    {
        let api = Arc::clone(&node.api);
        let advertisement = BlockAdvertisement {
            block: peer.rlp_encode(),
        };
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            api.advertise_block(advertisement);
        });
    }

    node.generator.produce_height().await.unwrap();

    // The client heard about its execution outcome even though our block
    // lost.
    assert_eq!(reply.await.unwrap().code, ErrorCode::Success);

    // Peer adopted: height advanced, nothing committed to the shards, the
    // transaction is requeued for the next height.
    assert_eq!(node.generator.producing_height(), 2);
    assert_eq!(node.generator.state_root(), genesis_root);
    for shard in &node.shards {
        assert!(shard.updates().is_empty());
    }
    assert_eq!(node.queue.len(), 1);
}

#[tokio::test]
async fn retried_transaction_lands_in_the_following_height() {
    let key = secret(11);
    let sender = address_of(&key);
    let recipient = [0xBB; 20];
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 30);
    let genesis_root = node.generator.state_root();

    // Queue the transfer, then hand the first height to a peer.
    node.api.advertise_block(BlockAdvertisement {
        block: {
            let mut peer_header = anchor_header(genesis_root);
            peer_header.number = 1;
            Block {
                header: peer_header,
                transactions: vec![],
            }
            .rlp_encode()
        },
    });
    let reply = {
        let api = Arc::clone(&node.api);
        let binary = transfer(&key, 0, Some(recipient), 40);
        tokio::spawn(async move {
            api.submit_transaction(TransactionRequest {
                transaction: binary,
                account_witnesses: vec![],
            })
            .await
        })
    };
    while node.queue.is_empty() {
        tokio::task::yield_now().await;
    }

    // Height 1: shortcut adoption of the already-learned peer block. The
    // batch was never gathered, so the transaction just stays queued.
    node.generator.produce_height().await.unwrap();
    assert_eq!(node.generator.producing_height(), 2);
    assert_eq!(node.queue.len(), 1);

    // Height 2: we win and the transfer commits.
    node.generator.produce_height().await.unwrap();
    assert_eq!(reply.await.unwrap().code, ErrorCode::Success);
    let expected = state_trie(&[(sender, 1, 60), (recipient, 0, 40)]);
    assert_eq!(node.generator.state_root(), expected.root_hash());

    // The block committed at height 2 chains onto the adopted peer block.
    let update = node.shards[0].updates().into_iter().next().unwrap();
    let block = Block::rlp_decode(&update.rlp_block).unwrap();
    assert_eq!(block.header.number, 2);
}
