//! Transaction decoding and the queued transaction record.
//!
//! Inbound transactions arrive as canonical Ethereum RLP (the 9-item list
//! with a secp256k1 signature). Decoding recovers the sender address from
//! the signature; cryptographic *validation* beyond recovery is assumed to
//! have happened upstream.

use crate::crypto::{hash_address, keccak256, Address, Hash, EMPTY_STRING_HASH};
use primitive_types::U256;
use rlp::{DecoderError, Rlp, RlpStream};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::oneshot;

/// Reply code surfaced to the submitting client.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Transaction executed and was included in the proposed block.
    Success,
    /// Transaction was malformed or failed execution checks.
    Invalid,
}

/// Errors from decoding a transaction's RLP or recovering its sender.
#[derive(Debug, Error)]
pub enum TransactionDecodeError {
    /// Malformed RLP structure.
    #[error("transaction RLP: {0}")]
    Rlp(#[from] DecoderError),

    /// The `v` field encodes no known recovery id.
    #[error("unsupported signature v value: {0}")]
    UnsupportedV(u64),

    /// The `to` field is neither empty nor a 20-byte address.
    #[error("recipient field is {0} bytes, expected 0 or 20")]
    BadRecipientLength(usize),

    /// Sender recovery failed.
    #[error("sender recovery: {0}")]
    Recovery(#[from] secp256k1::Error),
}

/// Decoded transaction fields with the recovered sender.
///
/// `to == None` is the contract-creation sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Vec<u8>,
    /// Sender address recovered from the signature.
    pub from: Address,
}

impl Transaction {
    /// Decode a canonical signed transaction and recover its sender.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionDecodeError> {
        let rlp = Rlp::new(bytes);
        if !rlp.is_list() || rlp.item_count()? != 9 {
            return Err(DecoderError::Custom("transaction is not a 9-item list").into());
        }

        let nonce: U256 = rlp.val_at(0)?;
        let gas_price: U256 = rlp.val_at(1)?;
        let gas_limit: U256 = rlp.val_at(2)?;
        let to_bytes: Vec<u8> = rlp.val_at(3)?;
        let value: U256 = rlp.val_at(4)?;
        let data: Vec<u8> = rlp.val_at(5)?;
        let v: u64 = rlp.val_at(6)?;
        let r: U256 = rlp.val_at(7)?;
        let s: U256 = rlp.val_at(8)?;

        let to = match to_bytes.len() {
            0 => None,
            20 => {
                let mut addr = [0u8; 20];
                addr.copy_from_slice(&to_bytes);
                Some(addr)
            }
            n => return Err(TransactionDecodeError::BadRecipientLength(n)),
        };

        let (recovery_id, chain_id) = split_v(v)?;
        let digest = signing_hash(
            nonce, gas_price, gas_limit, &to_bytes, value, &data, chain_id,
        );

        let mut compact = [0u8; 64];
        r.to_big_endian(&mut compact[..32]);
        s.to_big_endian(&mut compact[32..]);
        let signature = RecoverableSignature::from_compact(
            &compact,
            RecoveryId::from_i32(recovery_id)?,
        )?;

        let secp = Secp256k1::new();
        let pubkey = secp.recover_ecdsa(&Message::from_digest(digest), &signature)?;
        let from = address_of(&pubkey);

        Ok(Self {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
            from,
        })
    }
}

/// Split the signature `v` into (recovery id, optional chain id).
fn split_v(v: u64) -> Result<(i32, Option<u64>), TransactionDecodeError> {
    match v {
        27 | 28 => Ok(((v - 27) as i32, None)),
        v if v >= 35 => Ok((((v - 35) % 2) as i32, Some((v - 35) / 2))),
        other => Err(TransactionDecodeError::UnsupportedV(other)),
    }
}

/// Keccak-256 of the unsigned transaction RLP (with the chain-id trailer
/// when the signature carries one).
fn signing_hash(
    nonce: U256,
    gas_price: U256,
    gas_limit: U256,
    to: &[u8],
    value: U256,
    data: &[u8],
    chain_id: Option<u64>,
) -> Hash {
    let mut s = match chain_id {
        Some(_) => RlpStream::new_list(9),
        None => RlpStream::new_list(6),
    };
    s.append(&nonce);
    s.append(&gas_price);
    s.append(&gas_limit);
    s.append(&to.to_vec());
    s.append(&value);
    s.append(&data.to_vec());
    if let Some(id) = chain_id {
        s.append(&id);
        s.append_empty_data();
        s.append_empty_data();
    }
    keccak256(&s.out())
}

/// The last 20 bytes of the Keccak-256 of the uncompressed public key.
fn address_of(pubkey: &secp256k1::PublicKey) -> Address {
    let serialized = pubkey.serialize_uncompressed();
    let digest = keccak256(&serialized[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    addr
}

/// Sign and RLP-encode a transaction. Used by clients and test fixtures.
#[allow(clippy::too_many_arguments)]
pub fn sign_transaction(
    nonce: U256,
    gas_price: U256,
    gas_limit: U256,
    to: Option<Address>,
    value: U256,
    data: &[u8],
    chain_id: Option<u64>,
    secret: &SecretKey,
) -> Vec<u8> {
    let to_bytes: Vec<u8> = to.map(|a| a.to_vec()).unwrap_or_default();
    let digest = signing_hash(nonce, gas_price, gas_limit, &to_bytes, value, data, chain_id);

    let secp = Secp256k1::new();
    let signature = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), secret);
    let (recovery_id, compact) = signature.serialize_compact();

    let v = match chain_id {
        Some(id) => 35 + id * 2 + recovery_id.to_i32() as u64,
        None => 27 + recovery_id.to_i32() as u64,
    };

    let mut s = RlpStream::new_list(9);
    s.append(&nonce);
    s.append(&gas_price);
    s.append(&gas_limit);
    s.append(&to_bytes);
    s.append(&value);
    s.append(&data.to_vec());
    s.append(&v);
    s.append(&U256::from_big_endian(&compact[..32]));
    s.append(&U256::from_big_endian(&compact[32..]));
    s.out().to_vec()
}

/// One-shot reply channel surfacing the post-execution [`ErrorCode`] to the
/// submitting client. Sent exactly once.
#[derive(Debug)]
pub struct ReplyHandle(oneshot::Sender<ErrorCode>);

impl ReplyHandle {
    /// Create a handle together with the receiving half.
    pub fn channel() -> (Self, oneshot::Receiver<ErrorCode>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    /// Deliver the code. A disconnected client is not an error.
    pub fn send(self, code: ErrorCode) {
        let _ = self.0.send(code);
    }
}

/// A queued transaction record: the decoded transaction, its raw bytes,
/// its witness bag, and the reply handle back to the submitting client.
#[derive(Debug)]
pub struct TransactionData {
    /// Keccak-256 of the raw transaction bytes.
    pub tx_hash: Hash,
    /// Decoded fields with recovered sender.
    pub tx: Transaction,
    /// Raw signed RLP as submitted.
    pub tx_binary: Vec<u8>,
    /// Witness nodes keyed by their Keccak-256 hash.
    pub proofs: HashMap<Hash, Vec<u8>>,
    /// Keccak-256 of the sender address (trie key).
    pub from_hash: Hash,
    /// Keccak-256 of the recipient address (trie key).
    pub to_hash: Hash,
    /// Reply handle, consumed when the per-height reply fires.
    pub reply: Option<ReplyHandle>,
    /// Assigned after execution.
    pub error_code: ErrorCode,
}

impl TransactionData {
    /// Build a record from a decoded transaction and its witness bag.
    pub fn new(
        tx: Transaction,
        tx_binary: Vec<u8>,
        proofs: HashMap<Hash, Vec<u8>>,
        reply: Option<ReplyHandle>,
    ) -> Self {
        let tx_hash = keccak256(&tx_binary);
        let from_hash = hash_address(&tx.from);
        let to_hash = match tx.to {
            Some(ref to) => hash_address(to),
            None => EMPTY_STRING_HASH,
        };
        Self {
            tx_hash,
            tx,
            tx_binary,
            proofs,
            from_hash,
            to_hash,
            reply,
            error_code: ErrorCode::Invalid,
        }
    }

    /// Synthetic record for a transaction taken from a peer block: no
    /// witness bag, no client to reply to.
    pub fn synthetic(tx: Transaction, tx_binary: Vec<u8>) -> Self {
        Self::new(tx, tx_binary, HashMap::new(), None)
    }

    /// Fire the reply with the assigned error code. Idempotent.
    pub fn send_reply(&mut self) {
        if let Some(handle) = self.reply.take() {
            handle.send(self.error_code);
        }
    }
}
