//! Neighbor-side client: advertises nodes and blocks to another verifier
//! over the same framed wire the server speaks.

use crate::payloads::{
    BlockAdvertisement, MerkleNodeAdvertisement, RequestFrame, VerifierRequest,
};
use async_trait::async_trait;
use rb_network::framing::write_frame;
use rb_network::{NeighborTransport, NetworkError};
use tokio::net::TcpStream;

/// Framed-TCP neighbor transport.
pub struct TcpNeighbor {
    address: String,
}

impl TcpNeighbor {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    async fn send(&self, request: VerifierRequest) -> Result<(), NetworkError> {
        let mut stream = TcpStream::connect(&self.address).await?;
        let payload = bincode::serialize(&RequestFrame { id: 0, request })
            .map_err(|err| NetworkError::Wire(err.to_string()))?;
        write_frame(&mut stream, &payload).await
    }
}

#[async_trait]
impl NeighborTransport for TcpNeighbor {
    fn peer(&self) -> String {
        self.address.clone()
    }

    async fn advertise_nodes(&self, nodes: Vec<Vec<u8>>) -> Result<(), NetworkError> {
        self.send(VerifierRequest::AdvertiseNode(MerkleNodeAdvertisement {
            node_list: nodes,
        }))
        .await
    }

    async fn advertise_block(&self, block: Vec<u8>) -> Result<(), NetworkError> {
        self.send(VerifierRequest::AdvertiseBlock(BlockAdvertisement { block }))
            .await
    }
}
