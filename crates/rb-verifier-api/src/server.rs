//! Framed TCP transport in front of [`VerifierApi`].
//!
//! Each connection carries a sequence of request frames. Submissions are
//! answered on the same connection once execution decides; advertisement
//! frames are one-way streams and produce no response. A slow submission
//! never blocks the stream: every request runs on its own task and the
//! responses funnel through a per-connection writer.

use crate::handler::VerifierApi;
use crate::payloads::{RequestFrame, ResponseFrame, VerifierRequest, VerifierResponse};
use rb_network::framing::{read_frame, write_frame};
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound frames buffered per connection before backpressure.
const RESPONSE_CHANNEL_CAPACITY: usize = 256;

/// Accept loop for the verifier wire protocol.
pub struct VerifierServer {
    api: Arc<VerifierApi>,
}

impl VerifierServer {
    pub fn new(api: Arc<VerifierApi>) -> Self {
        Self { api }
    }

    /// Serve connections until the listener is closed or the task is
    /// dropped.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        info!(
            "[rb-api] verifier listening on {}",
            listener.local_addr()?
        );
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("[rb-api] connection from {}", peer);
            let api = Arc::clone(&self.api);
            tokio::spawn(async move {
                if let Err(err) = handle_connection(api, stream).await {
                    debug!("[rb-api] connection {} closed: {}", peer, err);
                }
            });
        }
    }
}

async fn handle_connection(
    api: Arc<VerifierApi>,
    stream: TcpStream,
) -> Result<(), rb_network::NetworkError> {
    let (mut reader, writer) = stream.into_split();
    let (response_tx, response_rx) = mpsc::channel::<ResponseFrame>(RESPONSE_CHANNEL_CAPACITY);
    tokio::spawn(write_responses(writer, response_rx));

    while let Some(payload) = read_frame(&mut reader).await? {
        let frame: RequestFrame = match bincode::deserialize(&payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("[rb-api] dropping malformed frame: {}", err);
                continue;
            }
        };
        dispatch(Arc::clone(&api), frame, response_tx.clone());
    }
    Ok(())
}

/// Route one frame. Replies are produced on their own task so a pending
/// submission does not stall the advertisement streams behind it.
fn dispatch(api: Arc<VerifierApi>, frame: RequestFrame, responses: mpsc::Sender<ResponseFrame>) {
    let id = frame.id;
    match frame.request {
        VerifierRequest::Handshake(msg) => {
            let response = VerifierResponse::Handshake(api.handshake(msg));
            let _ = responses.try_send(ResponseFrame { id, response });
        }
        VerifierRequest::SubmitTransaction(request) => {
            tokio::spawn(async move {
                let reply = api.submit_transaction(request).await;
                let response = VerifierResponse::TransactionReply(reply);
                let _ = responses.send(ResponseFrame { id, response }).await;
            });
        }
        VerifierRequest::AdvertiseNode(advertisement) => api.advertise_node(advertisement),
        VerifierRequest::AdvertiseBlock(advertisement) => api.advertise_block(advertisement),
        VerifierRequest::AdvertiseNeighbor(advertisement) => {
            api.advertise_neighbor(advertisement)
        }
    }
}

async fn write_responses(mut writer: OwnedWriteHalf, mut responses: mpsc::Receiver<ResponseFrame>) {
    while let Some(frame) = responses.recv().await {
        let payload = match bincode::serialize(&frame) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("[rb-api] failed to encode response: {}", err);
                continue;
            }
        };
        if write_frame(&mut writer, &payload).await.is_err() {
            // Peer went away; remaining responses have nowhere to go.
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{HandshakeMessage, MerkleNodeAdvertisement, PROTOCOL_VERSION};
    use rb_network::NetworkLearner;
    use shared_types::{keccak256, TransactionQueue};

    async fn start_server() -> (std::net::SocketAddr, Arc<TransactionQueue>, Arc<NetworkLearner>)
    {
        let queue = Arc::new(TransactionQueue::new());
        let (learner, _rx) = NetworkLearner::new(1);
        let api = Arc::new(VerifierApi::new(
            Arc::clone(&queue),
            Arc::clone(&learner),
            [0xBE; 20],
            "rainblock-verifier/test",
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(VerifierServer::new(api).serve(listener));
        (addr, queue, learner)
    }

    #[tokio::test]
    async fn handshake_round_trips_over_tcp() {
        let (addr, _queue, _learner) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let request = RequestFrame {
            id: 1,
            request: VerifierRequest::Handshake(HandshakeMessage {
                protocol_version: PROTOCOL_VERSION,
                version: "client/0.1".into(),
                beneficiary: [0x01; 20],
            }),
        };
        write_frame(&mut stream, &bincode::serialize(&request).unwrap())
            .await
            .unwrap();

        let payload = read_frame(&mut stream).await.unwrap().unwrap();
        let frame: ResponseFrame = bincode::deserialize(&payload).unwrap();
        assert_eq!(frame.id, 1);
        match frame.response {
            VerifierResponse::Handshake(msg) => {
                assert_eq!(msg.beneficiary, [0xBE; 20]);
                assert_eq!(msg.protocol_version, PROTOCOL_VERSION);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn advertisement_stream_feeds_the_learner() {
        let (addr, _queue, learner) = start_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        // A leaf node is the smallest well-formed advertisement.
        let node = rb_state_trie::MerkleNode::Leaf {
            path: rb_state_trie::Nibbles(vec![0x1]),
            value: vec![0x42],
        }
        .rlp_encode();
        let hash = keccak256(&node);

        for _ in 0..3 {
            let frame = RequestFrame {
                id: 0,
                request: VerifierRequest::AdvertiseNode(MerkleNodeAdvertisement {
                    node_list: vec![node.clone()],
                }),
            };
            write_frame(&mut stream, &bincode::serialize(&frame).unwrap())
                .await
                .unwrap();
        }

        // One-way stream: give the server a moment to drain it.
        for _ in 0..50 {
            if learner.current_nodes().contains_key(&hash) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("advertised node never reached the learner");
    }
}
