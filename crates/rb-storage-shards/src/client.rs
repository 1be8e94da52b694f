//! Shard client port, the framed TCP adapter, and the 16-way pool.

use crate::error::{Result, StorageError};
use crate::messages::{ShardReply, ShardRequest, UpdateMsg};
use crate::routing::SHARD_COUNT;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use rb_network::framing::{read_frame, write_frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

/// Client side of one storage shard.
#[async_trait]
pub trait ShardClient: Send + Sync {
    /// Shard index in `0..16`.
    fn shard(&self) -> usize;

    /// Probe reachability (startup preflight).
    async fn connect(&self) -> Result<()>;

    /// Commit one block's update message.
    async fn update(&self, msg: UpdateMsg) -> Result<()>;
}

/// Framed-TCP shard client.
pub struct TcpShardClient {
    shard: usize,
    host: String,
}

impl TcpShardClient {
    pub fn new(shard: usize, host: impl Into<String>) -> Self {
        Self {
            shard,
            host: host.into(),
        }
    }

    fn wire_error(&self, err: rb_network::NetworkError) -> StorageError {
        match err {
            rb_network::NetworkError::Io(io) => StorageError::Io(io),
            rb_network::NetworkError::Wire(msg) => StorageError::Wire(msg),
        }
    }
}

#[async_trait]
impl ShardClient for TcpShardClient {
    fn shard(&self) -> usize {
        self.shard
    }

    async fn connect(&self) -> Result<()> {
        TcpStream::connect(&self.host)
            .await
            .map(drop)
            .map_err(|err| StorageError::Unreachable {
                shard: self.shard,
                reason: err.to_string(),
            })
    }

    async fn update(&self, msg: UpdateMsg) -> Result<()> {
        let mut stream = TcpStream::connect(&self.host).await?;
        let payload = bincode::serialize(&ShardRequest::Update(msg))
            .map_err(|err| StorageError::Wire(err.to_string()))?;
        write_frame(&mut stream, &payload)
            .await
            .map_err(|err| self.wire_error(err))?;

        let reply = read_frame(&mut stream)
            .await
            .map_err(|err| self.wire_error(err))?
            .ok_or_else(|| StorageError::UpdateFailed {
                shard: self.shard,
                reason: "connection closed before reply".into(),
            })?;
        match bincode::deserialize::<ShardReply>(&reply)
            .map_err(|err| StorageError::Wire(err.to_string()))?
        {
            ShardReply::Ok => {
                debug!("[rb-shards] shard {} acknowledged update", self.shard);
                Ok(())
            }
            ShardReply::Error(reason) => Err(StorageError::UpdateFailed {
                shard: self.shard,
                reason,
            }),
        }
    }
}

/// The full set of 16 shard clients.
pub struct ShardPool {
    clients: Vec<Arc<dyn ShardClient>>,
}

impl ShardPool {
    /// Build a pool; exactly [`SHARD_COUNT`] clients required.
    pub fn new(clients: Vec<Arc<dyn ShardClient>>) -> Result<Self> {
        if clients.len() != SHARD_COUNT {
            return Err(StorageError::WrongShardCount {
                expected: SHARD_COUNT,
                actual: clients.len(),
            });
        }
        Ok(Self { clients })
    }

    /// Verify every shard is reachable within `timeout`. Startup aborts on
    /// failure.
    pub async fn preflight(&self, timeout: Duration) -> Result<()> {
        let probes = self.clients.iter().map(|client| {
            let client = Arc::clone(client);
            async move {
                match tokio::time::timeout(timeout, client.connect()).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::Unreachable {
                        shard: client.shard(),
                        reason: format!("no connection within {timeout:?}"),
                    }),
                }
            }
        });
        for result in join_all(probes).await {
            result?;
        }
        info!("[rb-shards] all {} shards reachable", SHARD_COUNT);
        Ok(())
    }

    /// Send all 16 update messages in parallel and wait for every shard.
    ///
    /// Each failure is logged; the first one is returned after the whole
    /// fan-out has settled, so no shard is left with an abandoned send.
    pub async fn update_all(&self, messages: Vec<UpdateMsg>) -> Result<()> {
        if messages.len() != SHARD_COUNT {
            return Err(StorageError::WrongShardCount {
                expected: SHARD_COUNT,
                actual: messages.len(),
            });
        }

        let sends = self
            .clients
            .iter()
            .zip(messages)
            .map(|(client, msg)| {
                let client = Arc::clone(client);
                async move { client.update(msg).await }
            });

        let mut first_error = None;
        for (shard, result) in join_all(sends).await.into_iter().enumerate() {
            if let Err(err) = result {
                error!("[rb-shards] shard {} update failed: {}", shard, err);
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory shard client recording every update it receives. Used by the
/// test suites and single-process bring-up.
#[derive(Default)]
pub struct RecordingShardClient {
    shard: usize,
    updates: Mutex<Vec<UpdateMsg>>,
}

impl RecordingShardClient {
    pub fn new(shard: usize) -> Self {
        Self {
            shard,
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Updates received so far.
    pub fn updates(&self) -> Vec<UpdateMsg> {
        self.updates.lock().clone()
    }

    /// Build a full recording pool plus handles to every client.
    pub fn pool() -> (ShardPool, Vec<Arc<RecordingShardClient>>) {
        let clients: Vec<Arc<RecordingShardClient>> =
            (0..SHARD_COUNT).map(|i| Arc::new(Self::new(i))).collect();
        let as_trait: Vec<Arc<dyn ShardClient>> = clients
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn ShardClient>)
            .collect();
        let pool = ShardPool::new(as_trait).expect("exactly SHARD_COUNT clients");
        (pool, clients)
    }
}

#[async_trait]
impl ShardClient for RecordingShardClient {
    fn shard(&self) -> usize {
        self.shard
    }

    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn update(&self, msg: UpdateMsg) -> Result<()> {
        self.updates.lock().push(msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_messages() -> Vec<UpdateMsg> {
        (0..SHARD_COUNT)
            .map(|_| UpdateMsg {
                rlp_block: vec![0x01],
                merkle_tree_nodes: vec![0x02],
                operations: vec![],
            })
            .collect()
    }

    #[test]
    fn pool_requires_sixteen_clients() {
        let clients: Vec<Arc<dyn ShardClient>> = (0..3)
            .map(|i| Arc::new(RecordingShardClient::new(i)) as Arc<dyn ShardClient>)
            .collect();
        assert!(matches!(
            ShardPool::new(clients),
            Err(StorageError::WrongShardCount { actual: 3, .. })
        ));
    }

    #[tokio::test]
    async fn update_all_reaches_every_shard() {
        let (pool, clients) = RecordingShardClient::pool();
        pool.update_all(empty_messages()).await.unwrap();
        for client in clients {
            assert_eq!(client.updates().len(), 1);
        }
    }

    #[tokio::test]
    async fn update_all_rejects_short_message_list() {
        let (pool, _clients) = RecordingShardClient::pool();
        let result = pool.update_all(vec![]).await;
        assert!(matches!(
            result,
            Err(StorageError::WrongShardCount { actual: 0, .. })
        ));
    }

    #[tokio::test]
    async fn preflight_succeeds_on_reachable_pool() {
        let (pool, _clients) = RecordingShardClient::pool();
        pool.preflight(Duration::from_millis(100)).await.unwrap();
    }

    #[tokio::test]
    async fn preflight_times_out_on_unreachable_shard() {
        struct NeverConnects(usize);

        #[async_trait]
        impl ShardClient for NeverConnects {
            fn shard(&self) -> usize {
                self.0
            }
            async fn connect(&self) -> Result<()> {
                futures::future::pending().await
            }
            async fn update(&self, _msg: UpdateMsg) -> Result<()> {
                Ok(())
            }
        }

        let clients: Vec<Arc<dyn ShardClient>> = (0..SHARD_COUNT)
            .map(|i| Arc::new(NeverConnects(i)) as Arc<dyn ShardClient>)
            .collect();
        let pool = ShardPool::new(clients).unwrap();
        let result = pool.preflight(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StorageError::Unreachable { .. })));
    }
}
