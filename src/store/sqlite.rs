//! Diesel/SQLite implementations of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;

use super::{EndpointStore, HistoryStore, OperationLogStore, ServiceStore, TunnelRuntimeUpdate, TunnelStore};
use crate::db::model::{
    EndpointRow, NewOperationLogRow, NewServiceHistoryRow, NewTunnelRow, ServiceRow, TunnelRow,
};
use crate::db::schema::{endpoints, service_history, services, tunnel_operation_logs, tunnels};
use crate::db::DbPool;
use crate::domain::{
    Endpoint, EndpointId, EndpointStatus, InstanceId, Service, ServiceHistory, Tunnel, TunnelKey,
    TunnelStatus, TunnelType,
};
use crate::error::{Error, Result};

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("bad timestamp {value:?}: {e}")))
}

fn endpoint_from_row(row: EndpointRow) -> Result<Endpoint> {
    let status = EndpointStatus::parse(&row.status)
        .ok_or_else(|| Error::Database(format!("unknown endpoint status {:?}", row.status)))?;
    Ok(Endpoint {
        id: EndpointId(row.id),
        url: row.url,
        api_path: row.api_path,
        api_key: row.api_key,
        status,
        tunnel_count: row.tunnel_count,
    })
}

fn tunnel_from_row(row: TunnelRow) -> Result<Tunnel> {
    let tunnel_type = TunnelType::parse(&row.tunnel_type)
        .ok_or_else(|| Error::Database(format!("unknown tunnel type {:?}", row.tunnel_type)))?;
    let status = TunnelStatus::parse(&row.status)
        .ok_or_else(|| Error::Database(format!("unknown tunnel status {:?}", row.status)))?;
    let tls_mode = match row.tls_mode.as_str() {
        "inherit" => crate::domain::TlsMode::Inherit,
        "0" => crate::domain::TlsMode::Disabled,
        "1" => crate::domain::TlsMode::SelfSigned,
        "2" => crate::domain::TlsMode::Custom,
        other => return Err(Error::Database(format!("unknown tls mode {other:?}"))),
    };

    Ok(Tunnel {
        endpoint_id: EndpointId(row.endpoint_id),
        instance_id: InstanceId(row.instance_id),
        name: row.name,
        tunnel_type,
        tunnel_address: row.tunnel_address,
        tunnel_port: row.tunnel_port,
        target_address: row.target_address,
        target_port: row.target_port,
        tls_mode,
        log_level: row.log_level,
        password: row.password,
        min: row.min,
        max: row.max,
        mode: row.mode,
        read: row.read,
        rate: row.rate,
        restart: row.restart,
        status,
        tcp_rx: row.tcp_rx,
        tcp_tx: row.tcp_tx,
        udp_rx: row.udp_rx,
        udp_tx: row.udp_tx,
        ping: row.ping,
        pool: row.pool,
        tcps: row.tcps,
        udps: row.udps,
        last_event_time: parse_rfc3339(&row.last_event_time)?,
        command_line: row.command_line,
        peer_sid: row.peer_sid,
        peer_type: row.peer_type,
    })
}

fn tunnel_to_new_row(tunnel: &Tunnel, now: &str) -> NewTunnelRow {
    NewTunnelRow {
        endpoint_id: tunnel.endpoint_id.0,
        instance_id: tunnel.instance_id.0.clone(),
        name: tunnel.name.clone(),
        tunnel_type: tunnel.tunnel_type.as_str().to_string(),
        tunnel_address: tunnel.tunnel_address.clone(),
        tunnel_port: tunnel.tunnel_port,
        target_address: tunnel.target_address.clone(),
        target_port: tunnel.target_port,
        tls_mode: tunnel.tls_mode.as_str().to_string(),
        log_level: tunnel.log_level.clone(),
        password: tunnel.password.clone(),
        min: tunnel.min.clone(),
        max: tunnel.max.clone(),
        mode: tunnel.mode.clone(),
        read: tunnel.read.clone(),
        rate: tunnel.rate.clone(),
        restart: tunnel.restart,
        status: tunnel.status.as_str().to_string(),
        tcp_rx: tunnel.tcp_rx,
        tcp_tx: tunnel.tcp_tx,
        udp_rx: tunnel.udp_rx,
        udp_tx: tunnel.udp_tx,
        ping: tunnel.ping,
        pool: tunnel.pool,
        tcps: tunnel.tcps,
        udps: tunnel.udps,
        last_event_time: tunnel.last_event_time.to_rfc3339(),
        command_line: tunnel.command_line.clone(),
        peer_sid: tunnel.peer_sid.clone(),
        peer_type: tunnel.peer_type.clone(),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

/// SQLite-backed implementation of every store trait, sharing one pool.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Shared pool accessor for callers that need a direct Diesel query
    /// outside the store traits (e.g. integration tests reading rows the
    /// core itself never queries back, like `service_history`).
    pub fn pool(&self) -> &crate::db::DbPool {
        &self.pool
    }
}

#[async_trait]
impl EndpointStore for SqliteStore {
    async fn get(&self, id: EndpointId) -> Result<Option<Endpoint>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<EndpointRow> = endpoints::table
            .find(id.0)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(endpoint_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Endpoint>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let rows: Vec<EndpointRow> = endpoints::table
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(endpoint_from_row).collect()
    }

    async fn set_status(&self, id: EndpointId, status: EndpointStatus) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        diesel::update(endpoints::table.find(id.0))
            .set((endpoints::status.eq(status.as_str()), endpoints::updated_at.eq(now)))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn refresh_tunnel_count(&self, id: EndpointId) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let count: i64 = tunnels::table
            .filter(tunnels::endpoint_id.eq(id.0))
            .count()
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        diesel::update(endpoints::table.find(id.0))
            .set((endpoints::tunnel_count.eq(count), endpoints::updated_at.eq(now)))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl TunnelStore for SqliteStore {
    /// Idempotent create: conflict on `(endpoint_id, instance_id)` listing
    /// the mutable columns explicitly. `created_at` is deliberately
    /// excluded from the `SET` clause.
    async fn upsert(&self, tunnel: &Tunnel) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        let row = tunnel_to_new_row(tunnel, &now);

        diesel::insert_into(tunnels::table)
            .values(&row)
            .on_conflict((tunnels::endpoint_id, tunnels::instance_id))
            .do_update()
            .set((
                tunnels::name.eq(excluded(tunnels::name)),
                tunnels::tunnel_type.eq(excluded(tunnels::tunnel_type)),
                tunnels::tunnel_address.eq(excluded(tunnels::tunnel_address)),
                tunnels::tunnel_port.eq(excluded(tunnels::tunnel_port)),
                tunnels::target_address.eq(excluded(tunnels::target_address)),
                tunnels::target_port.eq(excluded(tunnels::target_port)),
                tunnels::tls_mode.eq(excluded(tunnels::tls_mode)),
                tunnels::log_level.eq(excluded(tunnels::log_level)),
                tunnels::password.eq(excluded(tunnels::password)),
                tunnels::min.eq(excluded(tunnels::min)),
                tunnels::max.eq(excluded(tunnels::max)),
                tunnels::mode.eq(excluded(tunnels::mode)),
                tunnels::read.eq(excluded(tunnels::read)),
                tunnels::rate.eq(excluded(tunnels::rate)),
                tunnels::restart.eq(excluded(tunnels::restart)),
                tunnels::status.eq(excluded(tunnels::status)),
                tunnels::tcp_rx.eq(excluded(tunnels::tcp_rx)),
                tunnels::tcp_tx.eq(excluded(tunnels::tcp_tx)),
                tunnels::udp_rx.eq(excluded(tunnels::udp_rx)),
                tunnels::udp_tx.eq(excluded(tunnels::udp_tx)),
                tunnels::ping.eq(excluded(tunnels::ping)),
                tunnels::pool.eq(excluded(tunnels::pool)),
                tunnels::tcps.eq(excluded(tunnels::tcps)),
                tunnels::udps.eq(excluded(tunnels::udps)),
                tunnels::last_event_time.eq(excluded(tunnels::last_event_time)),
                tunnels::command_line.eq(excluded(tunnels::command_line)),
                tunnels::peer_sid.eq(excluded(tunnels::peer_sid)),
                tunnels::peer_type.eq(excluded(tunnels::peer_type)),
                tunnels::updated_at.eq(excluded(tunnels::updated_at)),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// Applies only the fields a runtime-info update touches, leaving every
    /// other column (name, addressing, TLS/log options) untouched.
    async fn apply_runtime_update(&self, key: &TunnelKey, update: TunnelRuntimeUpdate) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let target = tunnels::table.filter(
            tunnels::endpoint_id
                .eq(key.endpoint_id.0)
                .and(tunnels::instance_id.eq(&key.instance_id.0)),
        );

        diesel::update(target)
            .set((
                update.status.map(|v| tunnels::status.eq(v)),
                update.restart.map(|v| tunnels::restart.eq(Some(v))),
                update.tcp_rx.map(|v| tunnels::tcp_rx.eq(v)),
                update.tcp_tx.map(|v| tunnels::tcp_tx.eq(v)),
                update.udp_rx.map(|v| tunnels::udp_rx.eq(v)),
                update.udp_tx.map(|v| tunnels::udp_tx.eq(v)),
                update.ping.map(|v| tunnels::ping.eq(Some(v))),
                update.pool.map(|v| tunnels::pool.eq(Some(v))),
                update.tcps.map(|v| tunnels::tcps.eq(Some(v))),
                update.udps.map(|v| tunnels::udps.eq(Some(v))),
                update.command_line.map(|v| tunnels::command_line.eq(Some(v))),
                update.peer_sid.map(|v| tunnels::peer_sid.eq(Some(v))),
                update.peer_type.map(|v| tunnels::peer_type.eq(Some(v))),
                update.tunnel_address.map(|v| tunnels::tunnel_address.eq(Some(v))),
                update.tunnel_port.map(|v| tunnels::tunnel_port.eq(Some(v))),
                update.target_address.map(|v| tunnels::target_address.eq(Some(v))),
                update.target_port.map(|v| tunnels::target_port.eq(Some(v))),
                update.tls_mode.map(|v| tunnels::tls_mode.eq(v)),
                update.log_level.map(|v| tunnels::log_level.eq(v)),
                tunnels::last_event_time.eq(update.last_event_time.to_rfc3339()),
                tunnels::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// Applies the whole batch inside one transaction; the caller is
    /// responsible for chunking the batch to 100-500 rows before calling
    /// this.
    async fn apply_runtime_updates_batch(&self, updates: &[(TunnelKey, TunnelRuntimeUpdate)]) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for (key, update) in updates {
                let now = Utc::now().to_rfc3339();
                let target = tunnels::table.filter(
                    tunnels::endpoint_id
                        .eq(key.endpoint_id.0)
                        .and(tunnels::instance_id.eq(&key.instance_id.0)),
                );

                diesel::update(target)
                    .set((
                        update.status.clone().map(|v| tunnels::status.eq(v)),
                        update.restart.map(|v| tunnels::restart.eq(Some(v))),
                        update.tcp_rx.map(|v| tunnels::tcp_rx.eq(v)),
                        update.tcp_tx.map(|v| tunnels::tcp_tx.eq(v)),
                        update.udp_rx.map(|v| tunnels::udp_rx.eq(v)),
                        update.udp_tx.map(|v| tunnels::udp_tx.eq(v)),
                        update.ping.map(|v| tunnels::ping.eq(Some(v))),
                        update.pool.map(|v| tunnels::pool.eq(Some(v))),
                        update.tcps.map(|v| tunnels::tcps.eq(Some(v))),
                        update.udps.map(|v| tunnels::udps.eq(Some(v))),
                        update.command_line.clone().map(|v| tunnels::command_line.eq(Some(v))),
                        update.peer_sid.clone().map(|v| tunnels::peer_sid.eq(Some(v))),
                        update.peer_type.clone().map(|v| tunnels::peer_type.eq(Some(v))),
                        update.tunnel_address.clone().map(|v| tunnels::tunnel_address.eq(Some(v))),
                        update.tunnel_port.map(|v| tunnels::tunnel_port.eq(Some(v))),
                        update.target_address.clone().map(|v| tunnels::target_address.eq(Some(v))),
                        update.target_port.map(|v| tunnels::target_port.eq(Some(v))),
                        update.tls_mode.clone().map(|v| tunnels::tls_mode.eq(v)),
                        update.log_level.clone().map(|v| tunnels::log_level.eq(v)),
                        tunnels::last_event_time.eq(update.last_event_time.to_rfc3339()),
                        tunnels::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_offline_by_endpoint(&self, id: EndpointId) -> Result<u64> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let affected = diesel::update(tunnels::table.filter(tunnels::endpoint_id.eq(id.0)))
            .set((tunnels::status.eq(TunnelStatus::Offline.as_str()), tunnels::updated_at.eq(now)))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(affected as u64)
    }

    async fn delete(&self, key: &TunnelKey) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        diesel::delete(
            tunnels::table.filter(
                tunnels::endpoint_id
                    .eq(key.endpoint_id.0)
                    .and(tunnels::instance_id.eq(&key.instance_id.0)),
            ),
        )
        .execute(&mut conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete_cascade(&self, key: &TunnelKey) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let row_id: Option<i64> = tunnels::table
                .filter(
                    tunnels::endpoint_id
                        .eq(key.endpoint_id.0)
                        .and(tunnels::instance_id.eq(&key.instance_id.0)),
                )
                .select(tunnels::id)
                .first(conn)
                .optional()?;

            if let Some(row_id) = row_id {
                diesel::delete(tunnel_operation_logs::table.filter(tunnel_operation_logs::tunnel_id.eq(row_id)))
                    .execute(conn)?;
            }

            diesel::delete(
                tunnels::table.filter(
                    tunnels::endpoint_id
                        .eq(key.endpoint_id.0)
                        .and(tunnels::instance_id.eq(&key.instance_id.0)),
                ),
            )
            .execute(conn)?;

            Ok(())
        })
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &TunnelKey) -> Result<Option<Tunnel>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<TunnelRow> = tunnels::table
            .filter(
                tunnels::endpoint_id
                    .eq(key.endpoint_id.0)
                    .and(tunnels::instance_id.eq(&key.instance_id.0)),
            )
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(tunnel_from_row).transpose()
    }

    async fn last_event_time(&self, key: &TunnelKey) -> Result<Option<DateTime<Utc>>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let value: Option<String> = tunnels::table
            .filter(
                tunnels::endpoint_id
                    .eq(key.endpoint_id.0)
                    .and(tunnels::instance_id.eq(&key.instance_id.0)),
            )
            .select(tunnels::last_event_time)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        value.map(|v| parse_rfc3339(&v)).transpose()
    }

    async fn find_by_peer(&self, sid: &str, peer_type: &str) -> Result<Option<Tunnel>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<TunnelRow> = tunnels::table
            .filter(tunnels::peer_sid.eq(sid).and(tunnels::peer_type.eq(peer_type)))
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(tunnel_from_row).transpose()
    }
}

#[async_trait]
impl ServiceStore for SqliteStore {
    async fn upsert(&self, service: &Service) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row = ServiceRow {
            sid: service.sid.clone(),
            peer_type: service.peer_type.clone(),
            local_endpoint_id: service.local_endpoint_id.0,
            local_instance_id: service.local_instance_id.0.clone(),
            peer_endpoint_id: service.peer_endpoint_id.map(|id| id.0),
            peer_instance_id: service.peer_instance_id.as_ref().map(|id| id.0.clone()),
            total_rx: service.total_rx,
            total_tx: service.total_tx,
            sorts: service.sorts,
            updated_at: service.updated_at.to_rfc3339(),
        };

        diesel::insert_into(services::table)
            .values(&row)
            .on_conflict((services::sid, services::type_))
            .do_update()
            .set((
                services::local_endpoint_id.eq(excluded(services::local_endpoint_id)),
                services::local_instance_id.eq(excluded(services::local_instance_id)),
                services::peer_endpoint_id.eq(excluded(services::peer_endpoint_id)),
                services::peer_instance_id.eq(excluded(services::peer_instance_id)),
                services::total_rx.eq(excluded(services::total_rx)),
                services::total_tx.eq(excluded(services::total_tx)),
                services::sorts.eq(excluded(services::sorts)),
                services::updated_at.eq(excluded(services::updated_at)),
            ))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, sid: &str, peer_type: &str) -> Result<Option<Service>> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row: Option<ServiceRow> = services::table
            .filter(services::sid.eq(sid).and(services::type_.eq(peer_type)))
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(|r| {
            Ok(Service {
                sid: r.sid,
                peer_type: r.peer_type,
                local_endpoint_id: EndpointId(r.local_endpoint_id),
                local_instance_id: InstanceId(r.local_instance_id),
                peer_endpoint_id: r.peer_endpoint_id.map(EndpointId),
                peer_instance_id: r.peer_instance_id.map(InstanceId),
                total_rx: r.total_rx,
                total_tx: r.total_tx,
                sorts: r.sorts,
                updated_at: parse_rfc3339(&r.updated_at)?,
            })
        })
        .transpose()
    }

    async fn max_sorts(&self) -> Result<i32> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let max: Option<i32> = services::table
            .select(diesel::dsl::max(services::sorts))
            .first(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(max.unwrap_or(0))
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn insert(&self, aggregate: &ServiceHistory) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row = NewServiceHistoryRow {
            endpoint_id: aggregate.endpoint_id.0,
            instance_id: aggregate.instance_id.0.clone(),
            record_time: aggregate.record_time.to_rfc3339(),
            record_count: aggregate.record_count,
            up_count: aggregate.up_count,
            delta_tcp_in: aggregate.delta_tcp_in,
            delta_tcp_out: aggregate.delta_tcp_out,
            delta_udp_in: aggregate.delta_udp_in,
            delta_udp_out: aggregate.delta_udp_out,
            avg_speed_in: aggregate.avg_speed_in,
            avg_speed_out: aggregate.avg_speed_out,
            avg_ping: aggregate.avg_ping,
            last_pool: aggregate.last_pool,
            last_tcps: aggregate.last_tcps,
            last_udps: aggregate.last_udps,
        };

        diesel::insert_into(service_history::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl OperationLogStore for SqliteStore {
    async fn append(&self, key: &TunnelKey, tunnel_row_id: i64, action: &str, message: Option<&str>) -> Result<()> {
        let mut conn = self.pool.get().map_err(|e| Error::Connection(e.to_string()))?;

        let row = NewOperationLogRow {
            tunnel_id: tunnel_row_id,
            endpoint_id: key.endpoint_id.0,
            instance_id: key.instance_id.0.clone(),
            action: action.to_string(),
            message: message.map(|m| m.to_string()),
            created_at: Utc::now().to_rfc3339(),
        };

        diesel::insert_into(tunnel_operation_logs::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::domain::{TlsMode, TunnelType};

    fn setup() -> SqliteStore {
        let pool = create_pool(":memory:", 1).expect("pool");
        SqliteStore::new(pool)
    }

    fn sample_tunnel() -> Tunnel {
        Tunnel {
            endpoint_id: EndpointId(1),
            instance_id: InstanceId("inst-1".to_string()),
            name: Some("svc".to_string()),
            tunnel_type: TunnelType::Server,
            tunnel_address: Some("0.0.0.0".to_string()),
            tunnel_port: Some(8080),
            target_address: Some("10.0.0.1".to_string()),
            target_port: Some(80),
            tls_mode: TlsMode::Inherit,
            log_level: "info".to_string(),
            password: None,
            min: None,
            max: None,
            mode: None,
            read: None,
            rate: None,
            restart: Some(true),
            status: TunnelStatus::Running,
            tcp_rx: 10,
            tcp_tx: 20,
            udp_rx: 0,
            udp_tx: 0,
            ping: Some(5),
            pool: Some(3),
            tcps: Some(1),
            udps: Some(0),
            last_event_time: Utc::now(),
            command_line: None,
            peer_sid: None,
            peer_type: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = setup();
        let tunnel = sample_tunnel();
        store.upsert(&tunnel).await.unwrap();

        let fetched = store.get(&tunnel.key()).await.unwrap().unwrap();
        assert_eq!(fetched.tcp_rx, 10);
        assert_eq!(fetched.status, TunnelStatus::Running);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_conflict() {
        let store = setup();
        let mut tunnel = sample_tunnel();
        store.upsert(&tunnel).await.unwrap();

        tunnel.tcp_rx = 999;
        tunnel.status = TunnelStatus::Error;
        store.upsert(&tunnel).await.unwrap();

        let fetched = store.get(&tunnel.key()).await.unwrap().unwrap();
        assert_eq!(fetched.tcp_rx, 999);
        assert_eq!(fetched.status, TunnelStatus::Error);
    }

    #[tokio::test]
    async fn runtime_update_touches_only_named_fields() {
        let store = setup();
        let tunnel = sample_tunnel();
        store.upsert(&tunnel).await.unwrap();

        let update = TunnelRuntimeUpdate {
            tcp_rx: Some(500),
            last_event_time: Utc::now(),
            ..Default::default()
        };
        store.apply_runtime_update(&tunnel.key(), update).await.unwrap();

        let fetched = store.get(&tunnel.key()).await.unwrap().unwrap();
        assert_eq!(fetched.tcp_rx, 500);
        assert_eq!(fetched.name, Some("svc".to_string()));
    }

    #[tokio::test]
    async fn mark_offline_by_endpoint_updates_all_matching_tunnels() {
        let store = setup();
        let tunnel = sample_tunnel();
        store.upsert(&tunnel).await.unwrap();

        let affected = store.mark_offline_by_endpoint(tunnel.endpoint_id).await.unwrap();
        assert_eq!(affected, 1);

        let fetched = store.get(&tunnel.key()).await.unwrap().unwrap();
        assert_eq!(fetched.status, TunnelStatus::Offline);
    }
}
