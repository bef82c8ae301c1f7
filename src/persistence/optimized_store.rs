//! Optimized bulk store: a second buffer dedicated to runtime updates "of
//! interest", with a larger size threshold (1000) and an hourly-aligned
//! flush instead of the batch-insert buffer's 100-200ms timer. See
//! `persistence` module docs for which updates land here versus in the
//! batch-insert path.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::domain::TunnelKey;
use crate::store::{TunnelRuntimeUpdate, TunnelStore};

/// Each flush inserts at most this many rows per transaction chunk.
const CHUNK_SIZE: usize = 500;

type Job = (TunnelKey, TunnelRuntimeUpdate);

struct Inner {
    store: Arc<dyn TunnelStore>,
    buffer: Mutex<Vec<Job>>,
    threshold: usize,
}

impl Inner {
    async fn flush(&self) {
        let batch = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        for chunk in batch.chunks(CHUNK_SIZE) {
            if let Err(e) = self.store.apply_runtime_updates_batch(chunk).await {
                error!(error = %e, rows = chunk.len(), "optimized bulk store flush failed");
            }
        }
    }
}

/// Front-end handed to store-job workers. Pushes go through an internal
/// channel so the caller never blocks on the flush lock.
#[derive(Clone)]
pub struct OptimizedStoreHandle {
    sender: mpsc::Sender<Job>,
}

impl OptimizedStoreHandle {
    pub async fn push(&self, key: TunnelKey, update: TunnelRuntimeUpdate) {
        if self.sender.send((key, update)).await.is_err() {
            warn!("optimized bulk store closed, dropping update");
        }
    }
}

pub struct OptimizedStore {
    handle: OptimizedStoreHandle,
    receiver: Option<mpsc::Receiver<Job>>,
    inner: Arc<Inner>,
}

impl OptimizedStore {
    pub fn new(store: Arc<dyn TunnelStore>, threshold: usize) -> Self {
        let (sender, receiver) = mpsc::channel(threshold.max(1) * 4);
        Self {
            handle: OptimizedStoreHandle { sender },
            receiver: Some(receiver),
            inner: Arc::new(Inner { store, buffer: Mutex::new(Vec::with_capacity(threshold)), threshold }),
        }
    }

    pub fn handle(&self) -> OptimizedStoreHandle {
        self.handle.clone()
    }

    /// Spawn the task appending incoming jobs to the buffer, flushing as
    /// soon as `threshold` is reached.
    pub fn spawn_collector(&mut self) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.receiver.take().expect("optimized store collector already spawned");
        let inner = self.inner.clone();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let should_flush = {
                    let mut buffer = inner.buffer.lock();
                    buffer.push(job);
                    buffer.len() >= inner.threshold
                };
                if should_flush {
                    inner.flush().await;
                }
            }
            debug!("optimized bulk store channel closed, collector exiting");
        })
    }

    /// Spawn the hourly-aligned flush timer: sleeps until the next wall
    /// clock hour boundary, then ticks every hour thereafter.
    pub fn spawn_hourly_timer(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration_until_next_hour()).await;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                inner.flush().await;
            }
        })
    }

    /// Flush whatever is currently buffered. Used for graceful shutdown.
    pub async fn flush_now(&self) {
        self.inner.flush().await;
    }
}

fn duration_until_next_hour() -> Duration {
    let now = Utc::now();
    let secs_into_hour = (now.minute() as u64) * 60 + (now.second() as u64);
    let remaining = 3600u64.saturating_sub(secs_into_hour);
    Duration::from_secs(if remaining == 0 { 3600 } else { remaining })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::domain::{EndpointId, InstanceId, TlsMode, Tunnel, TunnelStatus, TunnelType};
    use crate::store::sqlite::SqliteStore;

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
            peer_sid: Some("svc-1".to_string()),
            peer_type: Some("1".to_string()),
        }
    }

    #[tokio::test]
    async fn threshold_flush_applies_buffered_updates() {
        let pool = create_pool(":memory:", 1).unwrap();
        let store: Arc<dyn TunnelStore> = Arc::new(SqliteStore::new(pool));
        store.upsert(&sample_tunnel()).await.unwrap();

        let mut optimized = OptimizedStore::new(store.clone(), 2);
        let handle = optimized.handle();
        let collector = optimized.spawn_collector();

        let key = sample_tunnel().key();
        handle.push(key.clone(), TunnelRuntimeUpdate { tcp_rx: Some(1), last_event_time: Utc::now(), ..Default::default() }).await;
        handle.push(key.clone(), TunnelRuntimeUpdate { tcp_rx: Some(42), last_event_time: Utc::now(), ..Default::default() }).await;

        // Give the collector a moment to process both pushes and flush.
        tokio::time::sleep(Duration::from_millis(50)).await;
        collector.abort();

        let fetched = store.get(&key).await.unwrap().unwrap();
        assert_eq!(fetched.tcp_rx, 42);
    }

    #[test]
    fn next_hour_duration_is_bounded() {
        let d = duration_until_next_hour();
        assert!(d.as_secs() <= 3600);
    }
}
