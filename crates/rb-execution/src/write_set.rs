//! The per-block write-set: draft account states not yet committed to the
//! trie.
//!
//! Entries are keyed by the *unhashed* 20-byte address (the storage-shard
//! protocol wants it back) while each entry carries the hashed form the
//! trie is keyed by, so hot paths never rehash.

use shared_types::{Account, Address, Hash};
use std::collections::HashMap;

/// One draft account in flight.
#[derive(Clone, Debug)]
pub struct WriteSetEntry {
    /// Keccak-256 of the address (the trie key).
    pub hashed_address: Hash,
    /// Current draft state.
    pub account: Account,
}

/// Overlay of draft account states, consulted before the trie during a
/// single execution pass.
#[derive(Clone, Debug, Default)]
pub struct WriteSet {
    entries: HashMap<Address, WriteSetEntry>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft state for `address`, if any transaction this block touched it.
    pub fn get(&self, address: &Address) -> Option<&WriteSetEntry> {
        self.entries.get(address)
    }

    /// Record (or replace) the draft state for `address`.
    pub fn insert(&mut self, address: Address, hashed_address: Hash, account: Account) {
        self.entries.insert(
            address,
            WriteSetEntry {
                hashed_address,
                account,
            },
        );
    }

    /// Render as trie puts: (hashed address, RLP account).
    pub fn as_puts(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .values()
            .map(|entry| (entry.hashed_address.to_vec(), entry.account.rlp_encode()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &WriteSetEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use shared_types::hash_address;

    #[test]
    fn insert_overwrites_draft() {
        let mut set = WriteSet::new();
        let addr: Address = [0xAA; 20];
        let hashed = hash_address(&addr);

        set.insert(addr, hashed, Account::new(U256::zero(), U256::from(10u64)));
        set.insert(addr, hashed, Account::new(U256::one(), U256::from(7u64)));

        assert_eq!(set.len(), 1);
        let entry = set.get(&addr).unwrap();
        assert_eq!(entry.account.nonce, U256::one());
        assert_eq!(entry.account.balance, U256::from(7u64));
    }

    #[test]
    fn puts_are_keyed_by_hashed_address() {
        let mut set = WriteSet::new();
        let addr: Address = [0x01; 20];
        let hashed = hash_address(&addr);
        let account = Account::new(U256::zero(), U256::from(5u64));
        set.insert(addr, hashed, account.clone());

        let puts = set.as_puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, hashed.to_vec());
        assert_eq!(puts[0].1, account.rlp_encode());
    }
}
