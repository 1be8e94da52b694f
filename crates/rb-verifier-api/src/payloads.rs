//! Wire messages of the verifier protocol.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ErrorCode};

/// Version of the verifier wire protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// Verifier-to-verifier handshake; both sides send the same shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub protocol_version: u32,
    /// Software version string.
    pub version: String,
    /// The miner address this verifier credits in produced headers.
    pub beneficiary: Address,
}

/// A signed transaction plus the trie nodes witnessing its accounts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Canonical signed transaction RLP.
    pub transaction: Vec<u8>,
    /// RLP-encoded witness nodes for the touched account paths.
    pub account_witnesses: Vec<Vec<u8>>,
}

/// Reply to a transaction submission, sent once execution has decided.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionReply {
    pub code: ErrorCode,
}

/// A streamed batch of trie nodes from a peer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MerkleNodeAdvertisement {
    pub node_list: Vec<Vec<u8>>,
}

/// A streamed block from a peer verifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockAdvertisement {
    /// RLP-encoded block.
    pub block: Vec<u8>,
}

/// A peer announcing another verifier's address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeighborAdvertisement {
    pub address: String,
}

/// Request envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum VerifierRequest {
    Handshake(HandshakeMessage),
    SubmitTransaction(TransactionRequest),
    AdvertiseNode(MerkleNodeAdvertisement),
    AdvertiseBlock(BlockAdvertisement),
    AdvertiseNeighbor(NeighborAdvertisement),
}

/// Response envelope. Advertisements are one-way and get no response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum VerifierResponse {
    Handshake(HandshakeMessage),
    TransactionReply(TransactionReply),
}

/// One request frame on the wire. The id correlates the eventual response;
/// streamed advertisements may reuse any id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub request: VerifierRequest,
}

/// One response frame on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: u64,
    pub response: VerifierResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_round_trips_through_bincode() {
        let frame = RequestFrame {
            id: 7,
            request: VerifierRequest::SubmitTransaction(TransactionRequest {
                transaction: vec![0x01, 0x02],
                account_witnesses: vec![vec![0xAA], vec![0xBB]],
            }),
        };
        let bytes = bincode::serialize(&frame).unwrap();
        let decoded: RequestFrame = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.id, 7);
        match decoded.request {
            VerifierRequest::SubmitTransaction(req) => {
                assert_eq!(req.transaction, vec![0x01, 0x02]);
                assert_eq!(req.account_witnesses.len(), 2);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn response_frame_round_trips_through_bincode() {
        let frame = ResponseFrame {
            id: 9,
            response: VerifierResponse::TransactionReply(TransactionReply {
                code: ErrorCode::Success,
            }),
        };
        let bytes = bincode::serialize(&frame).unwrap();
        let decoded: ResponseFrame = bincode::deserialize(&bytes).unwrap();
        match decoded.response {
            VerifierResponse::TransactionReply(reply) => {
                assert_eq!(reply.code, ErrorCode::Success);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
