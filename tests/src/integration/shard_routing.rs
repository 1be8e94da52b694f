//! Write-set partitioning across the 16 storage shards.

use super::common::*;
use rb_storage_shards::shard_index;
use rb_verifier_api::TransactionRequest;
use shared_types::{hash_address, Block, ErrorCode};
use std::sync::Arc;

#[tokio::test]
async fn writes_land_on_their_nibble_shards_and_every_shard_gets_the_block() {
    // Senders and recipients chosen so all four written accounts hash
    // onto shards 0x3 and 0xC.
    let key_a = key_on_shard(0x3);
    let key_b = key_on_shard(0xC);
    let sender_a = address_of(&key_a);
    let sender_b = address_of(&key_b);
    let recipient_a = address_on_shard(0x3);
    let recipient_b = address_on_shard(0xC);

    let mut node = test_node(
        &[
            (sender_a, 0, 100),
            (sender_b, 0, 100),
            (recipient_a, 0, 0),
            (recipient_b, 0, 0),
        ],
        10,
    );

    for binary in [
        transfer(&key_a, 0, Some(recipient_a), 10),
        transfer(&key_b, 0, Some(recipient_b), 20),
    ] {
        let api = Arc::clone(&node.api);
        tokio::spawn(async move {
            let reply = api
                .submit_transaction(TransactionRequest {
                    transaction: binary,
                    account_witnesses: vec![],
                })
                .await;
            assert_eq!(reply.code, ErrorCode::Success);
        });
    }
    while node.queue.len() < 2 {
        tokio::task::yield_now().await;
    }

    node.generator.produce_height().await.unwrap();

    for (index, shard) in node.shards.iter().enumerate() {
        let update = single_update(shard).expect("every shard hears about the block");

        // Block and reanchor bytes go everywhere, decodable as a block.
        let block = Block::rlp_decode(&update.rlp_block).unwrap();
        assert_eq!(block.header.number, 1);
        assert_eq!(block.transactions.len(), 2);
        assert!(!update.merkle_tree_nodes.is_empty());

        // Operations only where the nibble routing says so.
        let expected_ops = if index == 0x3 || index == 0xC { 2 } else { 0 };
        assert_eq!(
            update.operations.len(),
            expected_ops,
            "shard {index} operation count"
        );
        for op in &update.operations {
            assert_eq!(shard_index(&hash_address(&op.account)), index);
        }
    }
}

#[tokio::test]
async fn operations_carry_post_state_balances() {
    let key = key_on_shard(0x7);
    let sender = address_of(&key);
    let recipient = address_on_shard(0x7);
    let mut node = test_node(&[(sender, 0, 100), (recipient, 0, 0)], 10);

    {
        let api = Arc::clone(&node.api);
        let binary = transfer(&key, 0, Some(recipient), 25);
        tokio::spawn(async move {
            api.submit_transaction(TransactionRequest {
                transaction: binary,
                account_witnesses: vec![],
            })
            .await
        });
    }
    while node.queue.is_empty() {
        tokio::task::yield_now().await;
    }
    node.generator.produce_height().await.unwrap();

    let update = single_update(&node.shards[0x7]).unwrap();
    assert_eq!(update.operations.len(), 2);
    for op in &update.operations {
        let balance = primitive_types::U256::from_big_endian(&op.balance);
        if op.account == sender {
            assert_eq!(balance, primitive_types::U256::from(75u64));
            assert_eq!(op.nonce, 1);
        } else {
            assert_eq!(op.account, recipient);
            assert_eq!(balance, primitive_types::U256::from(25u64));
            assert_eq!(op.nonce, 0);
        }
    }
}
