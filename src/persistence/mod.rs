//! Persistence Pipeline (C5): the store-job queue and its two downstream
//! buffers.
//!
//! Three collaborating stages:
//!
//! 1. [`StoreQueue`]: the store-job queue itself, capacity 20,000, N
//!    workers, routing each job by kind.
//! 2. [`batch_buffer::BatchInsertBuffer`] plus [`batch_queue::BatchInsertQueue`]:
//!    the near-real-time path for most runtime updates (size/time
//!    triggered flush).
//! 3. [`optimized_store::OptimizedStore`]: the slower, threshold/hourly
//!    path for updates "of interest".
//!
//! Design note on the two downstream paths: they must never both run for
//! the same event. A runtime update for a tunnel carrying a `peer_sid`
//! (i.e. part of a service grouping) is routed exclusively to the
//! optimized bulk store; every other runtime update is routed exclusively
//! to the batch-insert path. No single event is ever buffered by both
//! pipelines.

pub mod batch_buffer;
pub mod batch_queue;
pub mod optimized_store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::QueuesConfig;
use crate::domain::{Tunnel, TunnelKey};
use crate::filelog::FileLogSink;
use crate::store::{TunnelRuntimeUpdate, TunnelStore};

use batch_queue::BatchInsertQueueHandle;
use optimized_store::OptimizedStoreHandle;

/// One unit of persistence work handed from the event processor (C4) to
/// the store-job queue (C5). Deletes are applied synchronously by the
/// processor itself (the delete handler is a multi-step cascade, not a
/// fire-and-forget single insert) and never flow through here.
#[derive(Debug, Clone)]
pub enum StoreJob {
    /// Lifecycle create/initial-fallback upsert.
    Upsert(Tunnel),
    /// A runtime-info update.
    RuntimeUpdate(TunnelKey, TunnelRuntimeUpdate),
    /// Non-empty `logs` payload forwarded to the file-log collaborator.
    Log(TunnelKey, String),
}

#[derive(Clone)]
pub struct StoreQueueHandle {
    sender: mpsc::Sender<StoreJob>,
    dropped: Arc<AtomicU64>,
}

impl StoreQueueHandle {
    /// Enqueue a job without blocking. On a full queue the job is dropped
    /// and a warning logged (same drop-newest policy as C3).
    pub fn enqueue(&self, job: StoreJob) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(job) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped_total = total, "store-job queue full, dropping newest job");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct StoreQueue {
    handle: StoreQueueHandle,
    receiver: Option<mpsc::Receiver<StoreJob>>,
    worker_count: usize,
}

impl StoreQueue {
    pub fn new(queues: &QueuesConfig, worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queues.store_capacity);
        Self {
            handle: StoreQueueHandle { sender, dropped: Arc::new(AtomicU64::new(0)) },
            receiver: Some(receiver),
            worker_count,
        }
    }

    pub fn handle(&self) -> StoreQueueHandle {
        self.handle.clone()
    }

    pub fn dropped_count(&self) -> u64 {
        self.handle.dropped_count()
    }

    /// Spawn the worker pool draining the store-job queue.
    pub fn spawn_workers(
        &mut self,
        tunnel_store: Arc<dyn TunnelStore>,
        filelog: Arc<dyn FileLogSink>,
        batch_queue: BatchInsertQueueHandle,
        optimized_store: OptimizedStoreHandle,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let receiver = self.receiver.take().expect("store queue workers already spawned");
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        (0..self.worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let tunnel_store = tunnel_store.clone();
                let filelog = filelog.clone();
                let batch_queue = batch_queue.clone();
                let optimized_store = optimized_store.clone();
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut rx = receiver.lock().await;
                            rx.recv().await
                        };
                        let Some(job) = job else {
                            debug!(worker_id, "store-job queue closed, worker exiting");
                            break;
                        };
                        handle_job(job, &tunnel_store, &filelog, &batch_queue, &optimized_store).await;
                    }
                })
            })
            .collect()
    }
}

async fn handle_job(
    job: StoreJob,
    tunnel_store: &Arc<dyn TunnelStore>,
    filelog: &Arc<dyn FileLogSink>,
    batch_queue: &BatchInsertQueueHandle,
    optimized_store: &OptimizedStoreHandle,
) {
    match job {
        StoreJob::Log(key, logs) => {
            if let Err(e) = filelog.append(&key, &logs).await {
                error!(error = %e, key = %key, "file-log append failed");
            }
        }
        StoreJob::Upsert(tunnel) => {
            if let Err(e) = tunnel_store.upsert(&tunnel).await {
                error!(error = %e, key = %tunnel.key(), "single-insert upsert failed");
            }
        }
        StoreJob::RuntimeUpdate(key, update) => {
            // Updates "of interest" (service-grouped tunnels) are the
            // optimized bulk store's exclusive responsibility; every
            // other update goes through the batch-insert path.
            if update.peer_sid.is_some() {
                optimized_store.push(key, update).await;
            } else if !batch_queue.try_enqueue(key.clone(), update.clone()) {
                if let Err(e) = tunnel_store.apply_runtime_update(&key, update).await {
                    error!(error = %e, key = %key, "single-insert runtime update failed");
                }
            }
        }
    }
}
