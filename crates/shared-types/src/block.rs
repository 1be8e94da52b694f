//! Block and header types with canonical Ethereum RLP encoding.
//!
//! A block encodes as `RLP([header, transactions, uncles])` where the
//! transaction list carries the raw signed RLP items and the uncle list is
//! always empty. The header field order matches the canonical Ethereum
//! header so that `keccak(rlp(header))` is the block hash.

use crate::crypto::{keccak256, Address, Hash};
use primitive_types::U256;
use rlp::{DecoderError, Rlp, RlpStream};

/// Canonical block header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub parent_hash: Hash,
    pub uncle_hash: Hash,
    pub beneficiary: Address,
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: [u8; 256],
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: Hash,
    pub nonce: [u8; 8],
}

impl BlockHeader {
    /// Serialize in canonical field order.
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(15);
        s.append(&self.parent_hash.to_vec());
        s.append(&self.uncle_hash.to_vec());
        s.append(&self.beneficiary.to_vec());
        s.append(&self.state_root.to_vec());
        s.append(&self.transactions_root.to_vec());
        s.append(&self.receipts_root.to_vec());
        s.append(&self.logs_bloom.to_vec());
        s.append(&self.difficulty);
        s.append(&self.number);
        s.append(&self.gas_limit);
        s.append(&self.gas_used);
        s.append(&self.timestamp);
        s.append(&self.extra_data);
        s.append(&self.mix_hash.to_vec());
        s.append(&self.nonce.to_vec());
        s.out().to_vec()
    }

    /// Decode from an RLP list item.
    pub fn decode_rlp(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if !rlp.is_list() || rlp.item_count()? != 15 {
            return Err(DecoderError::Custom("header is not a 15-item list"));
        }
        Ok(Self {
            parent_hash: fixed::<32>(rlp, 0)?,
            uncle_hash: fixed::<32>(rlp, 1)?,
            beneficiary: fixed::<20>(rlp, 2)?,
            state_root: fixed::<32>(rlp, 3)?,
            transactions_root: fixed::<32>(rlp, 4)?,
            receipts_root: fixed::<32>(rlp, 5)?,
            logs_bloom: fixed::<256>(rlp, 6)?,
            difficulty: rlp.val_at(7)?,
            number: rlp.val_at(8)?,
            gas_limit: rlp.val_at(9)?,
            gas_used: rlp.val_at(10)?,
            timestamp: rlp.val_at(11)?,
            extra_data: rlp.val_at(12)?,
            mix_hash: fixed::<32>(rlp, 13)?,
            nonce: fixed::<8>(rlp, 14)?,
        })
    }

    /// Decode from raw bytes.
    pub fn rlp_decode(bytes: &[u8]) -> Result<Self, DecoderError> {
        Self::decode_rlp(&Rlp::new(bytes))
    }

    /// Keccak-256 of the RLP-encoded header (the block hash).
    pub fn hash(&self) -> Hash {
        keccak256(&self.rlp_encode())
    }
}

fn fixed<const N: usize>(rlp: &Rlp<'_>, index: usize) -> Result<[u8; N], DecoderError> {
    rlp.val_at::<Vec<u8>>(index)?
        .try_into()
        .map_err(|_| DecoderError::Custom("fixed-width field has wrong length"))
}

/// A block: header plus the raw RLP of each transaction. Uncles are always
/// empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    /// Raw signed transaction RLP items, in block order.
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    /// Serialize as `RLP([header, transactions, []])`.
    pub fn rlp_encode(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(3);
        s.append_raw(&self.header.rlp_encode(), 1);
        s.begin_list(self.transactions.len());
        for tx in &self.transactions {
            s.append_raw(tx, 1);
        }
        s.begin_list(0);
        s.out().to_vec()
    }

    /// Decode from raw bytes.
    pub fn rlp_decode(bytes: &[u8]) -> Result<Self, DecoderError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() || rlp.item_count()? != 3 {
            return Err(DecoderError::Custom("block is not a 3-item list"));
        }
        let header = BlockHeader::decode_rlp(&rlp.at(0)?)?;
        let tx_list = rlp.at(1)?;
        let mut transactions = Vec::with_capacity(tx_list.item_count()?);
        for item in tx_list.iter() {
            transactions.push(item.as_raw().to_vec());
        }
        Ok(Self {
            header,
            transactions,
        })
    }

    /// The block hash (hash of the header).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}
