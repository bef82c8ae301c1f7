//! Persistence-facing traits. Concrete implementation in `sqlite`.

pub mod sqlite;

use async_trait::async_trait;

use crate::domain::{Endpoint, EndpointId, Service, ServiceHistory, Tunnel, TunnelKey};
use crate::error::Result;

/// Mutable fields a runtime-info update is allowed to touch.
#[derive(Debug, Clone, Default)]
pub struct TunnelRuntimeUpdate {
    pub status: Option<String>,
    pub restart: Option<bool>,
    pub tcp_rx: Option<i64>,
    pub tcp_tx: Option<i64>,
    pub udp_rx: Option<i64>,
    pub udp_tx: Option<i64>,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub command_line: Option<String>,
    pub peer_sid: Option<String>,
    pub peer_type: Option<String>,
    /// URL-derived network fields, re-parsed from `instance.url` on every
    /// update since the remote may rewrite addressing without a
    /// `delete`+`create` pair.
    pub tunnel_address: Option<String>,
    pub tunnel_port: Option<i32>,
    pub target_address: Option<String>,
    pub target_port: Option<i32>,
    pub tls_mode: Option<String>,
    pub log_level: Option<String>,
    pub last_event_time: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn get(&self, id: EndpointId) -> Result<Option<Endpoint>>;
    async fn list(&self) -> Result<Vec<Endpoint>>;
    async fn set_status(&self, id: EndpointId, status: crate::domain::EndpointStatus) -> Result<()>;

    /// Recompute `tunnel_count` from the `tunnels` table.
    async fn refresh_tunnel_count(&self, id: EndpointId) -> Result<()>;
}

#[async_trait]
pub trait TunnelStore: Send + Sync {
    async fn upsert(&self, tunnel: &Tunnel) -> Result<()>;
    async fn apply_runtime_update(&self, key: &TunnelKey, update: TunnelRuntimeUpdate) -> Result<()>;

    /// Apply many runtime updates as one transaction where the backend
    /// supports it. The default sequentially applies each update outside
    /// a transaction; `SqliteStore` overrides this with a real one.
    async fn apply_runtime_updates_batch(&self, updates: &[(TunnelKey, TunnelRuntimeUpdate)]) -> Result<()> {
        for (key, update) in updates {
            self.apply_runtime_update(key, update.clone()).await?;
        }
        Ok(())
    }

    async fn mark_offline_by_endpoint(&self, id: EndpointId) -> Result<u64>;

    /// Single-row delete, used when no operation-log cleanup is needed
    /// (e.g. tests). Production delete handling goes through
    /// [`TunnelStore::delete_cascade`].
    async fn delete(&self, key: &TunnelKey) -> Result<()>;

    /// Delete operation-log rows referencing the tunnel, then delete the
    /// tunnel itself; both statements run in one transaction so a crash
    /// between them can't orphan logs.
    async fn delete_cascade(&self, key: &TunnelKey) -> Result<()>;

    async fn get(&self, key: &TunnelKey) -> Result<Option<Tunnel>>;
    async fn last_event_time(&self, key: &TunnelKey) -> Result<Option<chrono::DateTime<chrono::Utc>>>;

    /// Find the tunnel whose own `peer_sid`/`peer_type` match, used by
    /// service aggregation to join a two-ended service's opposite-side
    /// tunnel.
    async fn find_by_peer(&self, sid: &str, peer_type: &str) -> Result<Option<Tunnel>>;
}

#[async_trait]
pub trait ServiceStore: Send + Sync {
    async fn upsert(&self, service: &Service) -> Result<()>;
    async fn get(&self, sid: &str, peer_type: &str) -> Result<Option<Service>>;

    /// Highest `sorts` value across every service row, used to assign
    /// `sorts = max(existing)+1` to newly created rows.
    async fn max_sorts(&self) -> Result<i32>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, aggregate: &ServiceHistory) -> Result<()>;
}

#[async_trait]
pub trait OperationLogStore: Send + Sync {
    async fn append(&self, key: &TunnelKey, tunnel_row_id: i64, action: &str, message: Option<&str>) -> Result<()>;
}
