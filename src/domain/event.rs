//! Upstream SSE wire format and the typed event handed from the
//! dispatcher (C3) to the event processor (C4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::EndpointId;

/// `instance.meta.peer`: identifies the logical service a tunnel belongs
/// to for service aggregation.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PeerMeta {
    pub sid: Option<String>,
    #[serde(rename = "type")]
    pub peer_type: Option<String>,
    pub alias: Option<String>,
}

/// `instance.meta`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InstanceMeta {
    #[serde(default)]
    pub tags: Vec<String>,
    pub peer: Option<PeerMeta>,
}

/// `instance` object embedded in every SSE envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstancePayload {
    pub id: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub instance_type: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub tcprx: i64,
    #[serde(default)]
    pub tcptx: i64,
    #[serde(default)]
    pub udprx: i64,
    #[serde(default)]
    pub udptx: i64,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub alias: Option<String>,
    pub restart: Option<bool>,
    pub meta: Option<InstanceMeta>,
}

/// Raw envelope as it appears on the wire, one per SSE `data:` frame.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SseEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: String,
    pub instance: Option<InstancePayload>,
    pub logs: Option<String>,
}

/// The exhaustive set of event kinds the processor (C4) dispatches on.
/// An `Unknown` variant absorbs any `type` value the wire format doesn't
/// define; it is logged and dropped rather than rejected, so a new event
/// kind added upstream never takes the pipeline down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Initial,
    Create,
    Update,
    Delete,
    Log,
    Shutdown,
    Unknown(String),
}

impl EventKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "initial" => EventKind::Initial,
            "create" => EventKind::Create,
            "update" => EventKind::Update,
            "delete" => EventKind::Delete,
            "log" => EventKind::Log,
            "shutdown" => EventKind::Shutdown,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Initial => "initial",
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
            EventKind::Log => "log",
            EventKind::Shutdown => "shutdown",
            EventKind::Unknown(other) => other,
        }
    }
}

/// The typed event handed from C3's worker pool to C4's handlers. Carries
/// the endpoint id injected by the dispatcher and the parsed timestamp
/// (falling back to "now" if the wire value failed to parse).
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub endpoint_id: EndpointId,
    pub kind: EventKind,
    pub time: DateTime<Utc>,
    pub instance: Option<InstancePayload>,
    pub logs: Option<String>,
}

impl ParsedEvent {
    pub fn from_envelope(endpoint_id: EndpointId, envelope: SseEnvelope) -> Self {
        let time = DateTime::parse_from_rfc3339(&envelope.time)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Self {
            endpoint_id,
            kind: EventKind::parse(&envelope.event_type),
            time,
            instance: envelope.instance,
            logs: envelope.logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_envelope() {
        let raw = r#"{
            "type": "update",
            "time": "2024-05-01T12:34:56Z",
            "instance": {
                "id": "i1",
                "url": "client://:5000/10.0.0.1:80?log=info",
                "type": "client",
                "status": "running",
                "tcprx": 100, "tcptx": 50, "udprx": 0, "udptx": 0,
                "tcps": 1, "udps": 0, "ping": 12, "pool": 3,
                "meta": { "peer": { "sid": "svc-1", "type": "0" } }
            },
            "logs": null
        }"#;
        let envelope: SseEnvelope = serde_json::from_str(raw).unwrap();
        let parsed = ParsedEvent::from_envelope(EndpointId(7), envelope);
        assert_eq!(parsed.kind, EventKind::Update);
        assert_eq!(parsed.instance.as_ref().unwrap().tcprx, 100);
        assert_eq!(
            parsed
                .instance
                .as_ref()
                .unwrap()
                .meta
                .as_ref()
                .unwrap()
                .peer
                .as_ref()
                .unwrap()
                .sid,
            Some("svc-1".to_string())
        );
    }

    #[test]
    fn unknown_type_falls_back_to_unknown_variant() {
        let raw = r#"{"type":"heartbeat","time":"2024-05-01T12:34:56Z","instance":null,"logs":null}"#;
        let envelope: SseEnvelope = serde_json::from_str(raw).unwrap();
        let parsed = ParsedEvent::from_envelope(EndpointId(1), envelope);
        assert_eq!(parsed.kind, EventKind::Unknown("heartbeat".to_string()));
    }

    #[test]
    fn unparseable_time_falls_back_to_now() {
        let raw = r#"{"type":"update","time":"not-a-time","instance":null,"logs":null}"#;
        let envelope: SseEnvelope = serde_json::from_str(raw).unwrap();
        let before = Utc::now();
        let parsed = ParsedEvent::from_envelope(EndpointId(1), envelope);
        assert!(parsed.time >= before);
    }
}
