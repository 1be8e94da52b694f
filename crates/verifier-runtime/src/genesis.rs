//! One-shot genesis import: a JSON account dump into the state trie, and
//! the RLP genesis block anchoring the chain.
//!
//! Import is strict: a declared code hash must match the code bytes, and
//! accounts with pre-populated storage are rejected outright. After
//! loading, the trie root must equal the genesis header's state root or
//! startup aborts.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use primitive_types::U256;
use rb_state_trie::CachedTrie;
use shared_types::{
    hash_address, keccak256, Account, Address, Block, BlockHeader, EMPTY_TRIE_ROOT,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// One account entry in the JSON dump.
#[derive(Debug, serde::Deserialize)]
struct GenesisAccount {
    #[serde(default)]
    nonce: u64,
    /// Decimal or 0x-prefixed hex.
    balance: String,
    /// Hex-encoded code bytes.
    #[serde(default)]
    code: Option<String>,
    /// Declared Keccak-256 of the code, verified against `code`.
    #[serde(rename = "codeHash", default)]
    code_hash: Option<String>,
    #[serde(default)]
    storage: Option<HashMap<String, String>>,
}

/// Load the genesis account dump (plain or gzip JSON) into a fresh trie.
pub fn load_genesis_state(path: &Path) -> Result<CachedTrie> {
    let file =
        File::open(path).with_context(|| format!("opening genesis data {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let accounts: HashMap<String, GenesisAccount> =
        serde_json::from_reader(reader).context("parsing genesis account dump")?;

    let mut trie = CachedTrie::new();
    for (raw_address, entry) in &accounts {
        let address = parse_address(raw_address)
            .with_context(|| format!("genesis account {raw_address}"))?;

        if entry.storage.as_ref().is_some_and(|s| !s.is_empty()) {
            bail!("genesis account {raw_address} has storage, which is not yet supported");
        }

        let code = match &entry.code {
            Some(code_hex) => hex::decode(code_hex.trim_start_matches("0x"))
                .with_context(|| format!("genesis account {raw_address} code"))?,
            None => Vec::new(),
        };
        let code_hash = keccak256(&code);
        if let Some(declared) = &entry.code_hash {
            let declared = parse_hash(declared)
                .with_context(|| format!("genesis account {raw_address} codeHash"))?;
            if declared != code_hash {
                bail!("genesis account {raw_address}: declared codeHash does not match code");
            }
        }

        let account = Account {
            nonce: U256::from(entry.nonce),
            balance: parse_u256(&entry.balance)
                .with_context(|| format!("genesis account {raw_address} balance"))?,
            code_hash,
            storage_root: EMPTY_TRIE_ROOT,
        };
        trie.insert(&hash_address(&address), account.rlp_encode())
            .context("inserting genesis account")?;
    }

    info!("[runtime] imported {} genesis accounts", accounts.len());
    Ok(trie)
}

/// Read the RLP-encoded genesis block.
pub fn load_genesis_block(path: &Path) -> Result<Block> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading genesis block {}", path.display()))?;
    Block::rlp_decode(&bytes).context("decoding genesis block RLP")
}

/// Synthetic anchor header for deployments without a genesis block file.
pub fn default_anchor(state_root: shared_types::Hash) -> BlockHeader {
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

fn parse_address(raw: &str) -> Result<Address> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).context("address is not hex")?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("address must be 20 bytes"))
}

fn parse_hash(raw: &str) -> Result<shared_types::Hash> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).context("hash is not hex")?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("hash must be 32 bytes"))
}

fn parse_u256(raw: &str) -> Result<U256> {
    if let Some(hex_digits) = raw.strip_prefix("0x") {
        U256::from_str_radix(hex_digits, 16).context("hex value")
    } else {
        U256::from_dec_str(raw).context("decimal value")
    }
}
