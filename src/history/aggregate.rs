//! Aggregation math for one completed accumulation window.

use chrono::{Timelike, Utc};
use tracing::warn;

use crate::domain::{MonitoringData, ServiceHistory};

/// Samples per instance per aggregation window.
pub const WINDOW_SIZE: usize = 12;

/// Fallback per-sample interval when the observed time span is non-positive.
pub const DATA_INTERVAL_SECS: f64 = 5.0;

/// Reduce `samples` (ordered by arrival, least-recent first) to one
/// `ServiceHistory` row. Panics if `samples` is empty; callers only invoke
/// this once a ring has actually filled.
pub fn aggregate(samples: &[MonitoringData]) -> ServiceHistory {
    assert!(!samples.is_empty(), "aggregate requires at least one sample");

    let first = &samples[0];
    let last = samples.last().unwrap();
    let n = samples.len() as i32;

    let record_time = Utc::now()
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or_else(Utc::now);

    let span_secs = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
    let span_secs = if span_secs > 0.0 {
        span_secs
    } else {
        (samples.len().saturating_sub(1)) as f64 * DATA_INTERVAL_SECS
    };
    let span_secs = if span_secs > 0.0 { span_secs } else { DATA_INTERVAL_SECS };

    let delta_tcp_in = signed_delta("tcp_in", first.tcp_in, last.tcp_in);
    let delta_tcp_out = signed_delta("tcp_out", first.tcp_out, last.tcp_out);
    let delta_udp_in = signed_delta("udp_in", first.udp_in, last.udp_in);
    let delta_udp_out = signed_delta("udp_out", first.udp_out, last.udp_out);

    let avg_speed_in = (delta_tcp_in + delta_udp_in) as f64 / span_secs;
    let avg_speed_out = (delta_tcp_out + delta_udp_out) as f64 / span_secs;

    let ping_samples: Vec<i64> = samples.iter().filter_map(|s| s.ping).collect();
    let avg_ping = if ping_samples.is_empty() {
        0.0
    } else {
        ping_samples.iter().sum::<i64>() as f64 / ping_samples.len() as f64
    };

    let up_count = samples.iter().filter(|s| s.ping.is_some()).count() as i32;

    ServiceHistory {
        endpoint_id: last.endpoint_id,
        instance_id: last.instance_id.clone(),
        record_time,
        record_count: n,
        up_count,
        delta_tcp_in,
        delta_tcp_out,
        delta_udp_in,
        delta_udp_out,
        avg_speed_in,
        avg_speed_out,
        avg_ping,
        last_pool: last.pool.unwrap_or(0),
        last_tcps: last.tcps.unwrap_or(0),
        last_udps: last.udps.unwrap_or(0),
    }
}

/// `last - first`, falling back to `last` when the counter has reset.
fn signed_delta(label: &str, first: i64, last: i64) -> i64 {
    let delta = last - first;
    if delta < 0 {
        warn!(counter = label, first, last, "counter reset detected, using last value as delta");
        last
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EndpointId, InstanceId};
    use chrono::TimeZone;

    fn sample(tcp_in: i64, offset_secs: i64, ping: Option<i64>) -> MonitoringData {
        MonitoringData {
            endpoint_id: EndpointId(7),
            instance_id: InstanceId("i1".to_string()),
            tcp_in,
            tcp_out: 0,
            udp_in: 0,
            udp_out: 0,
            ping,
            pool: Some(3),
            tcps: Some(1),
            udps: Some(0),
            timestamp: Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap(),
        }
    }

    #[test]
    fn matches_testable_property_6() {
        let samples = vec![
            sample(100, 0, Some(10)),
            sample(150, 14, Some(12)),
            sample(220, 28, Some(11)),
            sample(320, 55, Some(13)),
        ];
        let agg = aggregate(&samples);
        assert_eq!(agg.delta_tcp_in, 220);
        assert!((agg.avg_speed_in - (220.0 / 55.0)).abs() < 1e-9);
    }

    #[test]
    fn s3_history_emission_math() {
        let mut samples = Vec::new();
        for i in 0..12i64 {
            samples.push(sample(i * 10, i * 5, Some(1)));
        }
        let agg = aggregate(&samples);
        assert_eq!(agg.record_count, 12);
        assert_eq!(agg.delta_tcp_in, 110);
        assert!((agg.avg_speed_in - 2.0).abs() < 1e-9);
    }

    #[test]
    fn reset_uses_last_value_as_delta() {
        let mut samples = Vec::new();
        for i in 0..4i64 {
            samples.push(sample(500 - i * 10, i * 5, Some(1)));
        }
        samples.push(sample(20, 20, Some(1)));
        let agg = aggregate(&samples);
        assert_eq!(agg.delta_tcp_in, 20);
    }

    #[test]
    fn avg_ping_ignores_missing_samples() {
        let samples = vec![sample(0, 0, Some(10)), sample(10, 5, None), sample(20, 10, Some(20))];
        let agg = aggregate(&samples);
        assert!((agg.avg_ping - 15.0).abs() < 1e-9);
        assert_eq!(agg.up_count, 2);
    }
}
