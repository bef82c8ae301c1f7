//! Batch-insert buffer: size- and time-triggered flush of buffered runtime
//! updates into one chunked transaction.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::error;

use crate::domain::TunnelKey;
use crate::store::{TunnelRuntimeUpdate, TunnelStore};

/// Buffer is flushed as soon as it reaches this many rows.
const SIZE_TRIGGER: usize = 200;
/// Each flush inserts at most this many rows per transaction chunk.
const CHUNK_SIZE: usize = 200;

pub struct BatchInsertBuffer {
    store: Arc<dyn TunnelStore>,
    buffer: Mutex<Vec<(TunnelKey, TunnelRuntimeUpdate)>>,
}

impl BatchInsertBuffer {
    pub fn new(store: Arc<dyn TunnelStore>) -> Self {
        Self { store, buffer: Mutex::new(Vec::with_capacity(SIZE_TRIGGER)) }
    }

    /// Append an update. Flushes inline if the size trigger is hit.
    pub async fn push(self: &Arc<Self>, key: TunnelKey, update: TunnelRuntimeUpdate) {
        let should_flush = {
            let mut buffer = self.buffer.lock();
            buffer.push((key, update));
            buffer.len() >= SIZE_TRIGGER
        };
        if should_flush {
            self.flush().await;
        }
    }

    /// Copy out the buffer, reset it, and perform the chunked transactional
    /// insert. Failures are logged but never propagated.
    pub async fn flush(&self) {
        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        for chunk in batch.chunks(CHUNK_SIZE) {
            if let Err(e) = self.store.apply_runtime_updates_batch(chunk).await {
                error!(error = %e, rows = chunk.len(), "batch-insert flush failed");
            }
        }
    }

    /// Spawn the time-triggered flush loop.
    pub fn spawn_flush_timer(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.flush().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::domain::{EndpointId, InstanceId, TlsMode, Tunnel, TunnelStatus, TunnelType};
    use crate::store::sqlite::SqliteStore;
    use chrono::Utc;

    fn sample_tunnel() -> Tunnel {
        Tunnel {
            endpoint_id: EndpointId(1),
            instance_id: InstanceId("i1".to_string()),
            name: None,
            tunnel_type: TunnelType::Server,
            tunnel_address: None,
            tunnel_port: None,
            target_address: None,
            target_port: None,
            tls_mode: TlsMode::Inherit,
            log_level: "inherit".to_string(),
            password: None,
            min: None,
            max: None,
            mode: None,
            read: None,
            rate: None,
            restart: None,
            status: TunnelStatus::Running,
            tcp_rx: 0,
            tcp_tx: 0,
            udp_rx: 0,
            udp_tx: 0,
            ping: None,
            pool: None,
            tcps: None,
            udps: None,
            last_event_time: Utc::now(),
            command_line: None,
            peer_sid: None,
            peer_type: None,
        }
    }

    #[tokio::test]
    async fn flush_applies_buffered_updates() {
        let pool = create_pool(":memory:", 1).unwrap();
        let store: Arc<dyn TunnelStore> = Arc::new(SqliteStore::new(pool));
        store.upsert(&sample_tunnel()).await.unwrap();

        let buffer = Arc::new(BatchInsertBuffer::new(store.clone()));
        let update = TunnelRuntimeUpdate { tcp_rx: Some(42), last_event_time: Utc::now(), ..Default::default() };
        buffer.push(sample_tunnel().key(), update).await;
        buffer.flush().await;

        let fetched = store.get(&sample_tunnel().key()).await.unwrap().unwrap();
        assert_eq!(fetched.tcp_rx, 42);
    }
}
