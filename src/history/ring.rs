//! Per-instance ring buffer of monitoring samples.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::{MonitoringData, TunnelKey};

use super::aggregate::WINDOW_SIZE;

/// Map of per-instance rings. `DashMap`'s internal sharding plays the role
/// of the "coarser lock" guarding the map itself, while each ring keeps its
/// own read-write lock for append/snapshot.
#[derive(Default)]
pub struct RingMap {
    rings: DashMap<TunnelKey, Arc<RwLock<Vec<MonitoringData>>>>,
}

impl RingMap {
    pub fn new() -> Self {
        Self { rings: DashMap::new() }
    }

    /// Append `sample` to its instance's ring. Returns the full window
    /// (and resets the ring) once it reaches `WINDOW_SIZE`.
    pub fn push(&self, key: TunnelKey, sample: MonitoringData) -> Option<Vec<MonitoringData>> {
        let ring = self.rings.entry(key).or_insert_with(|| Arc::new(RwLock::new(Vec::with_capacity(WINDOW_SIZE)))).clone();

        let mut guard = ring.write();
        guard.push(sample);
        if guard.len() >= WINDOW_SIZE {
            let window = std::mem::replace(&mut *guard, Vec::with_capacity(WINDOW_SIZE));
            Some(window)
        } else {
            None
        }
    }

    pub fn instance_count(&self) -> usize {
        self.rings.len()
    }
}
