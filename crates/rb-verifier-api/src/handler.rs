//! Request handling behind the transport.

use crate::error::ApiError;
use crate::payloads::{
    BlockAdvertisement, HandshakeMessage, MerkleNodeAdvertisement, NeighborAdvertisement,
    TransactionRequest, TransactionReply, PROTOCOL_VERSION,
};
use rb_network::NetworkLearner;
use rb_state_trie::rlp_to_merkle_node;
use shared_types::{
    keccak256, Address, Block, ErrorCode, Hash, ReplyHandle, Transaction, TransactionData,
    TransactionQueue,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// The verifier's RPC surface: decodes submissions, enqueues them, and
/// feeds peer advertisements to the network learner.
pub struct VerifierApi {
    queue: Arc<TransactionQueue>,
    learner: Arc<NetworkLearner>,
    beneficiary: Address,
    version: String,
}

impl VerifierApi {
    pub fn new(
        queue: Arc<TransactionQueue>,
        learner: Arc<NetworkLearner>,
        beneficiary: Address,
        version: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            learner,
            beneficiary,
            version: version.into(),
        }
    }

    /// Answer a verifier-to-verifier handshake with our own identity.
    pub fn handshake(&self, peer: HandshakeMessage) -> HandshakeMessage {
        info!(
            "[rb-api] handshake from verifier {} (protocol {})",
            peer.version, peer.protocol_version
        );
        HandshakeMessage {
            protocol_version: PROTOCOL_VERSION,
            version: self.version.clone(),
            beneficiary: self.beneficiary,
        }
    }

    /// Decode, enqueue and await the post-execution reply for a submitted
    /// transaction. Decode failures reply `Invalid` immediately.
    pub async fn submit_transaction(&self, request: TransactionRequest) -> TransactionReply {
        match self.ingest(request) {
            Ok(receiver) => {
                // The sender half lives in the queued record; it drops
                // unsent only if the verifier shuts down mid-height.
                let code = receiver.await.unwrap_or(ErrorCode::Invalid);
                TransactionReply { code }
            }
            Err(err) => {
                warn!("[rb-api] rejecting submission: {}", err);
                TransactionReply {
                    code: ErrorCode::Invalid,
                }
            }
        }
    }

    /// Decode the transaction and its witnesses, then enqueue. No shared
    /// state is touched until everything has decoded.
    fn ingest(
        &self,
        request: TransactionRequest,
    ) -> Result<oneshot::Receiver<ErrorCode>, ApiError> {
        let tx = Transaction::decode(&request.transaction)?;

        let mut proofs: HashMap<Hash, Vec<u8>> = HashMap::with_capacity(
            request.account_witnesses.len(),
        );
        for bytes in request.account_witnesses {
            rlp_to_merkle_node(&bytes)?;
            proofs.insert(keccak256(&bytes), bytes);
        }

        let (handle, receiver) = ReplyHandle::channel();
        let record = TransactionData::new(tx, request.transaction, proofs, Some(handle));
        debug!(
            "[rb-api] queued transaction {} with {} witnesses",
            hex::encode(&record.tx_hash[..8]),
            record.proofs.len()
        );
        self.queue.push(record);
        Ok(receiver)
    }

    /// Ingest one streamed batch of advertised trie nodes.
    pub fn advertise_node(&self, advertisement: MerkleNodeAdvertisement) {
        for bytes in advertisement.node_list {
            match rlp_to_merkle_node(&bytes) {
                Ok(_) => {
                    self.learner.learn_node(bytes);
                }
                Err(err) => warn!("[rb-api] dropping malformed advertised node: {}", err),
            }
        }
    }

    /// Ingest one streamed block advertisement.
    pub fn advertise_block(&self, advertisement: BlockAdvertisement) {
        match Block::rlp_decode(&advertisement.block) {
            Ok(block) => self.learner.learn_block(block),
            Err(err) => warn!("[rb-api] dropping malformed advertised block: {}", err),
        }
    }

    /// Accepted for protocol compatibility; neighbor sets are configured
    /// statically for now.
    pub fn advertise_neighbor(&self, advertisement: NeighborAdvertisement) {
        debug!(
            "[rb-api] neighbor advertisement for {} (ignored)",
            advertisement.address
        );
    }
}
