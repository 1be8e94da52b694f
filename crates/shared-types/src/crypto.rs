//! Keccak-256 helpers and the sentinel digests used throughout the state
//! model.

use sha3::{Digest, Keccak256};

/// A 20-byte account address.
pub type Address = [u8; 20];

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// Keccak-256 of the empty byte sequence.
///
/// An account whose `code_hash` equals this digest carries no code.
pub const EMPTY_STRING_HASH: Hash = [
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03,
    0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85,
    0xa4, 0x70,
];

/// Keccak-256 of the RLP encoding of an empty trie (`0x80`).
///
/// The root hash of a trie with no entries, and the `storage_root` of an
/// account with no storage.
pub const EMPTY_TRIE_ROOT: Hash = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
];

/// Compute the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash an address into its 32-byte trie key.
pub fn hash_address(address: &Address) -> Hash {
    keccak256(address)
}
