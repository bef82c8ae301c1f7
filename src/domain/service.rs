//! Service aggregation domain types.
//!
//! Some tunnels carry a `peer.sid` + `peer.type`; when present the
//! processor maintains one `Service` row per `(sid, type)` capturing the
//! combined ingress/egress counters of a logical service.

use chrono::{DateTime, Utc};

use super::ids::{EndpointId, InstanceId};

/// Classification of a `peer.type` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTypeClass {
    /// `0`, `5`: single-ended; the tunnel's own counters are the total.
    SingleEnded,
    /// `1`/`2`, `3`/`4`, `6`/`7`: two-ended; totals sum this tunnel and
    /// its opposite-side counterpart, joined on `sid` + the opposite type.
    TwoEnded { opposite: &'static str },
}

/// Classify a `peer.type` string into the pairing rule it should follow.
pub fn classify_peer_type(peer_type: &str) -> Option<PeerTypeClass> {
    match peer_type {
        "0" | "5" => Some(PeerTypeClass::SingleEnded),
        "1" => Some(PeerTypeClass::TwoEnded { opposite: "2" }),
        "2" => Some(PeerTypeClass::TwoEnded { opposite: "1" }),
        "3" => Some(PeerTypeClass::TwoEnded { opposite: "4" }),
        "4" => Some(PeerTypeClass::TwoEnded { opposite: "3" }),
        "6" => Some(PeerTypeClass::TwoEnded { opposite: "7" }),
        "7" => Some(PeerTypeClass::TwoEnded { opposite: "6" }),
        _ => None,
    }
}

/// A logical service row keyed by `(sid, type)`, aggregating both ends of
/// a service sharing a peer SID.
#[derive(Debug, Clone)]
pub struct Service {
    pub sid: String,
    pub peer_type: String,
    /// Endpoint/instance of the tunnel that last wrote this `(sid, type)` row.
    pub local_endpoint_id: EndpointId,
    pub local_instance_id: InstanceId,
    /// The opposite-side tunnel this row was joined against, if any.
    pub peer_endpoint_id: Option<EndpointId>,
    pub peer_instance_id: Option<InstanceId>,
    pub total_rx: i64,
    pub total_tx: i64,
    pub sorts: i32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ended_types_have_no_opposite() {
        assert_eq!(classify_peer_type("0"), Some(PeerTypeClass::SingleEnded));
        assert_eq!(classify_peer_type("5"), Some(PeerTypeClass::SingleEnded));
    }

    #[test]
    fn two_ended_types_pair_up() {
        assert_eq!(classify_peer_type("1"), Some(PeerTypeClass::TwoEnded { opposite: "2" }));
        assert_eq!(classify_peer_type("2"), Some(PeerTypeClass::TwoEnded { opposite: "1" }));
        assert_eq!(classify_peer_type("3"), Some(PeerTypeClass::TwoEnded { opposite: "4" }));
        assert_eq!(classify_peer_type("4"), Some(PeerTypeClass::TwoEnded { opposite: "3" }));
        assert_eq!(classify_peer_type("6"), Some(PeerTypeClass::TwoEnded { opposite: "7" }));
        assert_eq!(classify_peer_type("7"), Some(PeerTypeClass::TwoEnded { opposite: "6" }));
    }

    #[test]
    fn unknown_type_is_not_classified() {
        assert_eq!(classify_peer_type("9"), None);
    }
}
