//! Tunnel (forwarding instance) domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EndpointId, InstanceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunnelType {
    Server,
    Client,
}

impl TunnelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelType::Server => "server",
            TunnelType::Client => "client",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "server" => Some(TunnelType::Server),
            "client" => Some(TunnelType::Client),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunnelStatus {
    Running,
    Stopped,
    Error,
    Offline,
}

impl TunnelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelStatus::Running => "running",
            TunnelStatus::Stopped => "stopped",
            TunnelStatus::Error => "error",
            TunnelStatus::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(TunnelStatus::Running),
            "stopped" => Some(TunnelStatus::Stopped),
            "error" => Some(TunnelStatus::Error),
            "offline" => Some(TunnelStatus::Offline),
            _ => None,
        }
    }
}

/// TLS mode for a server-type tunnel. Defaults to `Inherit` when the
/// instance URL carries no explicit `tls` query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsMode {
    Inherit,
    Disabled,
    SelfSigned,
    Custom,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Inherit => "inherit",
            TlsMode::Disabled => "0",
            TlsMode::SelfSigned => "1",
            TlsMode::Custom => "2",
        }
    }

    /// Parse the `tls` query value (`0|1|2`), meaningful only when mode=server.
    pub fn from_query_value(value: &str) -> Option<Self> {
        match value {
            "0" => Some(TlsMode::Disabled),
            "1" => Some(TlsMode::SelfSigned),
            "2" => Some(TlsMode::Custom),
            _ => None,
        }
    }
}

impl Default for TlsMode {
    fn default() -> Self {
        TlsMode::Inherit
    }
}

/// A forwarding instance on an endpoint, keyed by `(endpoint_id, instance_id)`.
#[derive(Debug, Clone)]
pub struct Tunnel {
    pub endpoint_id: EndpointId,
    pub instance_id: InstanceId,
    pub name: Option<String>,
    pub tunnel_type: TunnelType,
    pub tunnel_address: Option<String>,
    pub tunnel_port: Option<i32>,
    pub target_address: Option<String>,
    pub target_port: Option<i32>,
    pub tls_mode: TlsMode,
    pub log_level: String,
    pub password: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub mode: Option<String>,
    pub read: Option<String>,
    pub rate: Option<String>,
    pub restart: Option<bool>,
    pub status: TunnelStatus,
    pub tcp_rx: i64,
    pub tcp_tx: i64,
    pub udp_rx: i64,
    pub udp_tx: i64,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub last_event_time: DateTime<Utc>,
    pub command_line: Option<String>,
    pub peer_sid: Option<String>,
    pub peer_type: Option<String>,
}

impl Tunnel {
    pub fn key(&self) -> super::ids::TunnelKey {
        super::ids::TunnelKey::new(self.endpoint_id, self.instance_id.clone())
    }
}
