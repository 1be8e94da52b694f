//! The account model: nonce, balance, code hash and storage root.
//!
//! Accounts are value objects. Execution never mutates an account fetched
//! from the canonical trie directly; it edits a [`Account::draft`] copy held
//! in the write-set and the trie is only updated through the end-of-block
//! copy-on-write batch.

use crate::crypto::{Hash, EMPTY_STRING_HASH, EMPTY_TRIE_ROOT};
use primitive_types::U256;
use rlp::{DecoderError, Rlp, RlpStream};

/// In-memory representation of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Number of transactions sent from this account.
    pub nonce: U256,
    /// Balance in base units.
    pub balance: U256,
    /// Keccak-256 of the account's code (`EMPTY_STRING_HASH` if none).
    pub code_hash: Hash,
    /// Root of the account's storage trie (`EMPTY_TRIE_ROOT` if empty).
    pub storage_root: Hash,
}

impl Account {
    /// Create a plain value-holding account with no code and no storage.
    pub fn new(nonce: U256, balance: U256) -> Self {
        Self {
            nonce,
            balance,
            code_hash: EMPTY_STRING_HASH,
            storage_root: EMPTY_TRIE_ROOT,
        }
    }

    /// Whether this account carries contract code.
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_STRING_HASH
    }

    /// Independent mutable copy for in-flight execution edits.
    pub fn draft(&self) -> Self {
        self.clone()
    }

    /// Serialize as the canonical RLP 4-tuple
    /// (nonce, balance, codeHash, storageRoot).
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(4);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.code_hash.to_vec());
        s.append(&self.storage_root.to_vec());
        s.out().to_vec()
    }

    /// Decode from the RLP 4-tuple.
    pub fn rlp_decode(bytes: &[u8]) -> Result<Self, DecoderError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() || rlp.item_count()? != 4 {
            return Err(DecoderError::Custom("account is not a 4-item list"));
        }
        let code_hash: Hash = rlp
            .val_at::<Vec<u8>>(2)?
            .try_into()
            .map_err(|_| DecoderError::Custom("code hash is not 32 bytes"))?;
        let storage_root: Hash = rlp
            .val_at::<Vec<u8>>(3)?
            .try_into()
            .map_err(|_| DecoderError::Custom("storage root is not 32 bytes"))?;
        Ok(Self {
            nonce: rlp.val_at(0)?,
            balance: rlp.val_at(1)?,
            code_hash,
            storage_root,
        })
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new(U256::zero(), U256::zero())
    }
}
