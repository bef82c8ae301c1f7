//! Per-sample monitoring data (C6 input) and the time-bucketed aggregate
//! rows it produces.

use chrono::{DateTime, Utc};

use super::ids::{EndpointId, InstanceId};

/// A single sample pushed into the history worker's per-instance ring.
#[derive(Debug, Clone)]
pub struct MonitoringData {
    pub endpoint_id: EndpointId,
    pub instance_id: InstanceId,
    pub tcp_in: i64,
    pub tcp_out: i64,
    pub udp_in: i64,
    pub udp_out: i64,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// A time-bucketed aggregate row emitted once per completed accumulation
/// window.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceHistory {
    pub endpoint_id: EndpointId,
    pub instance_id: InstanceId,
    pub record_time: DateTime<Utc>,
    pub record_count: i32,
    pub up_count: i32,
    pub delta_tcp_in: i64,
    pub delta_tcp_out: i64,
    pub delta_udp_in: i64,
    pub delta_udp_out: i64,
    pub avg_speed_in: f64,
    pub avg_speed_out: f64,
    pub avg_ping: f64,
    pub last_pool: i64,
    pub last_tcps: i64,
    pub last_udps: i64,
}
