//! History Worker (C6): a single long-lived task accumulating per-instance
//! monitoring samples and emitting time-bucketed aggregates.

pub mod aggregate;
pub mod ring;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::domain::MonitoringData;
use crate::store::HistoryStore;

use ring::RingMap;

#[derive(Clone)]
pub struct HistoryHandle {
    sender: mpsc::Sender<MonitoringData>,
    dropped: Arc<AtomicU64>,
}

impl HistoryHandle {
    /// Enqueue a sample without blocking, dropping and warning on a full
    /// queue rather than backing up the event processor.
    pub fn push(&self, sample: MonitoringData) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(sample) {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped_total = total, "history input channel full, dropping sample");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct HistoryWorker {
    handle: HistoryHandle,
    receiver: Option<mpsc::Receiver<MonitoringData>>,
}

impl HistoryWorker {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self { handle: HistoryHandle { sender, dropped: Arc::new(AtomicU64::new(0)) }, receiver: Some(receiver) }
    }

    pub fn handle(&self) -> HistoryHandle {
        self.handle.clone()
    }

    /// Spawn the processing loop: append each sample to its instance ring
    /// and, once a window fills, aggregate and write it off a spawned task.
    pub fn spawn(&mut self, store: Arc<dyn HistoryStore>) -> tokio::task::JoinHandle<()> {
        let mut receiver = self.receiver.take().expect("history worker already spawned");
        let rings = Arc::new(RingMap::new());

        tokio::spawn(async move {
            while let Some(sample) = receiver.recv().await {
                let key = crate::domain::TunnelKey::new(sample.endpoint_id, sample.instance_id.clone());
                if let Some(window) = rings.push(key, sample) {
                    let store = store.clone();
                    tokio::spawn(async move {
                        let row = aggregate::aggregate(&window);
                        if let Err(e) = store.insert(&row).await {
                            error!(error = %e, "history aggregate write failed, dropping (next window re-emits a superset)");
                        }
                    });
                }
            }
        })
    }
}
