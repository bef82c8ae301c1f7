//! Collaborator interface for the remote control plane that owns tunnel
//! CRUD and system-info retrieval, which this crate only calls out to and
//! never implements itself. C4's `initial` handler calls this when an
//! instance arrives with an empty type, to fetch endpoint system info.

use async_trait::async_trait;

use crate::domain::EndpointId;
use crate::error::Result;

#[async_trait]
pub trait RemoteControlPlane: Send + Sync {
    /// Fetch and record system info for an endpoint whose SSE stream sent
    /// an instance with no `type`.
    async fn fetch_system_info(&self, endpoint_id: EndpointId) -> Result<()>;
}

/// No-op implementation for crates that embed the core without wiring a
/// real control-plane client (and for tests).
pub struct NullControlPlane;

#[async_trait]
impl RemoteControlPlane for NullControlPlane {
    async fn fetch_system_info(&self, _endpoint_id: EndpointId) -> Result<()> {
        Ok(())
    }
}
