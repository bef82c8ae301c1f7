//! Strongly-typed identifiers used throughout the ingestion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric id of a remote master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(pub i64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EndpointId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Instance id issued by the remote master for a single forwarding pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InstanceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Composite key uniquely identifying a tunnel: `(endpoint id, instance id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TunnelKey {
    pub endpoint_id: EndpointId,
    pub instance_id: InstanceId,
}

impl TunnelKey {
    pub fn new(endpoint_id: EndpointId, instance_id: InstanceId) -> Self {
        Self { endpoint_id, instance_id }
    }
}

impl fmt::Display for TunnelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint_id, self.instance_id)
    }
}
