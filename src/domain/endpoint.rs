//! Endpoint (remote master) domain type.

use serde::{Deserialize, Serialize};

use super::ids::EndpointId;

/// Connectivity status of a remote master, as observed by the connection
/// manager (C2) and persisted on the `endpoints` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStatus {
    Online,
    Offline,
    Fail,
    Disconnect,
}

impl EndpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointStatus::Online => "ONLINE",
            EndpointStatus::Offline => "OFFLINE",
            EndpointStatus::Fail => "FAIL",
            EndpointStatus::Disconnect => "DISCONNECT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ONLINE" => Some(EndpointStatus::Online),
            "OFFLINE" => Some(EndpointStatus::Offline),
            "FAIL" => Some(EndpointStatus::Fail),
            "DISCONNECT" => Some(EndpointStatus::Disconnect),
            _ => None,
        }
    }

    /// Endpoints in these states are not auto-started by `InitializeSystem`.
    pub fn is_excluded_from_startup(&self) -> bool {
        matches!(self, EndpointStatus::Fail | EndpointStatus::Disconnect)
    }
}

/// A remote master exposing an SSE telemetry stream and control API.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url: String,
    pub api_path: String,
    pub api_key: String,
    pub status: EndpointStatus,
    pub tunnel_count: i64,
}

impl Endpoint {
    /// The SSE subscription URL: `{endpoint.url}{apiPath}/events`.
    pub fn events_url(&self) -> String {
        format!("{}{}/events", self.url.trim_end_matches('/'), self.api_path)
    }
}
