//! Event Dispatcher (C3): bounded raw-job queue drained by a fixed worker
//! pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::QueuesConfig;
use crate::domain::{EndpointId, EventKind, ParsedEvent, SseEnvelope};
use crate::processor::EventProcessor;

/// One raw SSE payload, tagged with the endpoint it arrived from.
#[derive(Debug, Clone)]
pub struct RawJob {
    pub endpoint_id: EndpointId,
    pub payload: String,
}

/// Producer handle shared by every C1 connection task.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<RawJob>,
    dropped: Arc<AtomicU64>,
}

impl DispatcherHandle {
    /// Enqueue a raw payload without blocking. On a full queue the payload
    /// is dropped and a warning logged (drop-newest backpressure policy).
    pub fn enqueue(&self, job: RawJob) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(job) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped_total = total, "raw job queue full, dropping newest payload");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Owns the bounded queue and the worker pool draining it into the
/// processor (C4).
pub struct EventDispatcher {
    handle: DispatcherHandle,
    receiver: Option<mpsc::Receiver<RawJob>>,
    worker_count: usize,
}

impl EventDispatcher {
    pub fn new(queues: &QueuesConfig, worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queues.raw_capacity);
        Self {
            handle: DispatcherHandle { sender, dropped: Arc::new(AtomicU64::new(0)) },
            receiver: Some(receiver),
            worker_count,
        }
    }

    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    pub fn dropped_count(&self) -> u64 {
        self.handle.dropped_count()
    }

    /// Spawn the worker pool. Each worker decodes the envelope, injects the
    /// endpoint id and parsed timestamp, and dispatches by event kind.
    pub fn spawn_workers(&mut self, processor: Arc<EventProcessor>) -> Vec<tokio::task::JoinHandle<()>> {
        let receiver = self.receiver.take().expect("workers already spawned");
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        (0..self.worker_count)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let processor = processor.clone();
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut rx = receiver.lock().await;
                            rx.recv().await
                        };
                        let Some(job) = job else {
                            debug!(worker_id, "raw job queue closed, worker exiting");
                            break;
                        };
                        handle_job(worker_id, job, &processor).await;
                    }
                })
            })
            .collect()
    }
}

async fn handle_job(worker_id: usize, job: RawJob, processor: &Arc<EventProcessor>) {
    let envelope: SseEnvelope = match serde_json::from_str(&job.payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(worker_id, error = %e, "malformed SSE payload, dropping");
            return;
        }
    };

    let parsed = ParsedEvent::from_envelope(job.endpoint_id, envelope);
    if let EventKind::Unknown(kind) = &parsed.kind {
        debug!(worker_id, kind = %kind, "unknown event kind, dropping");
        return;
    }

    processor.handle(parsed).await;
}
