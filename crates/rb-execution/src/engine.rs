//! Ordered transaction application and end-of-block materialization.

use crate::error::{ExecutionError, Result};
use crate::write_set::WriteSet;
use primitive_types::U256;
use rb_state_trie::{BagChain, CachedTrie, UsedNodes};
use shared_types::{Account, Address, ErrorCode, Hash, TransactionData};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Execution behavior switches, loaded from the verifier configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionConfig {
    /// Unify all per-transaction witnesses into one bag per height, letting
    /// a later transaction reuse an earlier one's proofs.
    pub share_bag: bool,

    /// Synthesize absent sender accounts instead of failing the
    /// transaction (benchmark workloads).
    pub generate_from_accounts: bool,

    /// Skip sender-nonce equality enforcement.
    pub disable_nonce_check: bool,
}

/// Outcome of one execution pass over a batch.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Root hash of the successor trie.
    pub state_root: Hash,
    /// Always zero: code execution is out of scope.
    pub gas_used: u64,
    /// Wall-clock milliseconds at the end of the pass (header timestamp).
    pub timestamp: u64,
    /// Batch indices of the transactions that applied successfully, in
    /// execution order.
    pub order: Vec<usize>,
    /// Draft account states produced by the pass.
    pub write_set: WriteSet,
    /// The successor trie, to be installed once the block is adopted.
    pub new_tree: CachedTrie,
    /// Every trie node traversed, keyed by hash, for re-advertisement.
    pub used_nodes: UsedNodes,
    /// Time spent applying the batch.
    pub execution_time: Duration,
}

/// The stateful execution engine.
pub struct ExecutionEngine {
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Apply `txs` in queue order against `tree`.
    ///
    /// In proposal mode (`verify_only == false`) stub resolution draws on
    /// the transactions' own witness bags; in verify mode only the
    /// peer-learned node pools are consulted and the witness bags are
    /// ignored.
    ///
    /// Transaction-scoped failures mark the offending record
    /// [`ErrorCode::Invalid`] and the pass continues; an error return means
    /// the end-of-block rebuild itself failed.
    pub fn order_and_execute(
        &self,
        txs: &mut [TransactionData],
        tree: &CachedTrie,
        learned_current: &HashMap<Hash, Vec<u8>>,
        learned_previous: &HashMap<Hash, Vec<u8>>,
        verify_only: bool,
    ) -> Result<ExecutionResult> {
        let started = Instant::now();
        let mut write_set = WriteSet::new();
        let mut used_nodes = UsedNodes::new();
        let mut order = Vec::new();

        // Per-block union of all submitted witnesses. The end-of-block
        // rebuild always draws on it; per-transaction reads do too when
        // the shared bag is enabled.
        let mut witness_bag: HashMap<Hash, Vec<u8>> = HashMap::new();
        if !verify_only {
            for td in txs.iter() {
                for (hash, bytes) in &td.proofs {
                    witness_bag
                        .entry(*hash)
                        .or_insert_with(|| bytes.clone());
                }
            }
        }

        for index in 0..txs.len() {
            let outcome = {
                let td = &txs[index];
                let bags = if verify_only {
                    BagChain::layered(learned_current, learned_previous)
                } else if self.config.share_bag {
                    BagChain::layered(&witness_bag, learned_current).push(learned_previous)
                } else {
                    BagChain::layered(&td.proofs, learned_current).push(learned_previous)
                };
                self.apply_transaction(td, tree, &mut write_set, &mut used_nodes, &bags)
            };

            match outcome {
                Ok(()) => {
                    txs[index].error_code = ErrorCode::Success;
                    order.push(index);
                }
                Err(err) => {
                    txs[index].error_code = ErrorCode::Invalid;
                    warn!(
                        "[rb-exec] transaction {} rejected: {}",
                        hex::encode(&txs[index].tx_hash[..8]),
                        err
                    );
                }
            }
        }

        // The rebuild resolves through the same chain the reads did, so a
        // path that was reachable during execution stays reachable here.
        let puts = write_set.as_puts();
        let cow_bags = if verify_only {
            BagChain::layered(learned_current, learned_previous)
        } else {
            BagChain::layered(&witness_bag, learned_current).push(learned_previous)
        };
        let new_tree = tree.batch_cow(&puts, &mut used_nodes, &cow_bags)?;
        let state_root = new_tree.root_hash();

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let execution_time = started.elapsed();

        debug!(
            "[rb-exec] applied {}/{} transactions in {:?}",
            order.len(),
            txs.len(),
            execution_time
        );

        Ok(ExecutionResult {
            state_root,
            gas_used: 0,
            timestamp,
            order,
            write_set,
            new_tree,
            used_nodes,
            execution_time,
        })
    }

    /// Apply one transaction. No write-set mutation happens until every
    /// check has passed, so a failed transaction leaves no trace.
    fn apply_transaction(
        &self,
        td: &TransactionData,
        tree: &CachedTrie,
        write_set: &mut WriteSet,
        used_nodes: &mut UsedNodes,
        bags: &BagChain<'_>,
    ) -> Result<()> {
        let tx = &td.tx;

        let mut sender = self.get_sender(
            write_set,
            tree,
            &tx.from,
            &td.from_hash,
            bags,
            used_nodes,
            tx.nonce,
        )?;

        if !self.config.disable_nonce_check && tx.nonce != sender.nonce {
            return Err(ExecutionError::NonceMismatch {
                expected: sender.nonce,
                actual: tx.nonce,
            });
        }

        let to = tx.to.ok_or(ExecutionError::ContractCreationUnsupported)?;

        let debited = sender
            .balance
            .checked_sub(tx.value)
            .ok_or(ExecutionError::InsufficientBalance {
                required: tx.value,
                available: sender.balance,
            })?;

        // Self-transfer: the debit and credit cancel, only the nonce moves.
        if to == tx.from {
            sender.nonce = sender.nonce.overflowing_add(U256::one()).0;
            write_set.insert(tx.from, td.from_hash, sender);
            return Ok(());
        }

        match self.lookup_account(write_set, tree, &to, &td.to_hash, bags, used_nodes)? {
            None => {
                // Recipient does not exist yet: create it funded with the
                // transferred value.
                let created = Account::new(U256::zero(), tx.value);
                sender.balance = debited;
                sender.nonce = sender.nonce.overflowing_add(U256::one()).0;
                write_set.insert(to, td.to_hash, created);
                write_set.insert(tx.from, td.from_hash, sender);
            }
            Some(mut recipient) => {
                if recipient.has_code() {
                    warn!(
                        "[rb-exec] recipient {} carries code; applying as a plain \
                         transfer (code execution unsupported)",
                        hex::encode(to)
                    );
                }
                sender.balance = debited;
                sender.nonce = sender.nonce.overflowing_add(U256::one()).0;
                recipient.balance = recipient.balance.overflowing_add(tx.value).0;
                write_set.insert(to, td.to_hash, recipient);
                write_set.insert(tx.from, td.from_hash, sender);
            }
        }
        Ok(())
    }

    /// Fetch the sender: write-set first, then the trie through the bags.
    /// An absent sender is synthesized when the generate flag is on,
    /// seeded with the transaction's own nonce and a maximal balance.
    #[allow(clippy::too_many_arguments)]
    fn get_sender(
        &self,
        write_set: &WriteSet,
        tree: &CachedTrie,
        address: &Address,
        hashed_address: &Hash,
        bags: &BagChain<'_>,
        used_nodes: &mut UsedNodes,
        generate_nonce: U256,
    ) -> Result<Account> {
        if let Some(entry) = write_set.get(address) {
            return Ok(entry.account.draft());
        }
        match tree.get_with_bags(hashed_address, used_nodes, bags)? {
            Some(bytes) => Account::rlp_decode(&bytes).map_err(ExecutionError::AccountDecode),
            None if self.config.generate_from_accounts => {
                Ok(Account::new(generate_nonce, U256::MAX))
            }
            None => Err(ExecutionError::KeyNotFound {
                address: hex::encode(address),
            }),
        }
    }

    /// Fetch an account without synthesizing absent ones.
    fn lookup_account(
        &self,
        write_set: &WriteSet,
        tree: &CachedTrie,
        address: &Address,
        hashed_address: &Hash,
        bags: &BagChain<'_>,
        used_nodes: &mut UsedNodes,
    ) -> Result<Option<Account>> {
        if let Some(entry) = write_set.get(address) {
            return Ok(Some(entry.account.draft()));
        }
        match tree.get_with_bags(hashed_address, used_nodes, bags)? {
            Some(bytes) => Ok(Some(
                Account::rlp_decode(&bytes).map_err(ExecutionError::AccountDecode)?,
            )),
            None => Ok(None),
        }
    }
}
