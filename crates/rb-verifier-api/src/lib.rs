//! # Verifier API
//!
//! Decodes inbound transactions and their witness bags, enqueues them for
//! the block generator, and forwards peer advertisements to the network
//! learner. The transport is a request/reply-plus-streaming protocol over
//! length-prefixed bincode frames.
//!
//! Nothing here mutates shared state before a submission has fully
//! decoded: a malformed transaction or witness gets a synchronous
//! `Invalid` reply and is dropped.

pub mod error;
pub mod handler;
pub mod neighbor;
pub mod payloads;
pub mod server;

pub use error::ApiError;
pub use handler::VerifierApi;
pub use neighbor::TcpNeighbor;
pub use payloads::{
    BlockAdvertisement, HandshakeMessage, MerkleNodeAdvertisement, NeighborAdvertisement,
    RequestFrame, ResponseFrame, TransactionRequest, TransactionReply, VerifierRequest,
    VerifierResponse, PROTOCOL_VERSION,
};
pub use server::VerifierServer;
