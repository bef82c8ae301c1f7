//! Queue-status observability snapshot, exposed as the "queue-status
//! metrics" external interface.

use serde::Serialize;

/// Capacity/occupancy/drop counters for one bounded queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub name: &'static str,
    pub capacity: usize,
    pub dropped_total: u64,
}

/// Point-in-time snapshot across every bounded queue in the pipeline,
/// assembled by whichever component owns the wiring (`main`'s `run`
/// subcommand, or the `status` subcommand against a running instance's
/// metrics endpoint if one is wired in by an embedding application).
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusSnapshot {
    pub raw: QueueStatus,
    pub store: QueueStatus,
    pub history: QueueStatus,
    pub connected_endpoints: usize,
    pub broadcast_clients: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_to_json() {
        let snapshot = QueueStatusSnapshot {
            raw: QueueStatus { name: "raw", capacity: 30_000, dropped_total: 0 },
            store: QueueStatus { name: "store", capacity: 20_000, dropped_total: 3 },
            history: QueueStatus { name: "history", capacity: 15_000, dropped_total: 0 },
            connected_endpoints: 2,
            broadcast_clients: 5,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"dropped_total\":3"));
    }
}
