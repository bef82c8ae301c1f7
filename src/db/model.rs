//! Diesel row types mirroring `db::schema`.

use diesel::prelude::*;

use super::schema::{endpoints, service_history, services, tunnel_operation_logs, tunnels};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = endpoints)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EndpointRow {
    pub id: i64,
    pub url: String,
    pub api_path: String,
    pub api_key: String,
    pub status: String,
    pub tunnel_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = endpoints)]
pub struct NewEndpointRow {
    pub id: i64,
    pub url: String,
    pub api_path: String,
    pub api_key: String,
    pub status: String,
    pub tunnel_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tunnels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TunnelRow {
    pub id: i64,
    pub endpoint_id: i64,
    pub instance_id: String,
    pub name: Option<String>,
    pub tunnel_type: String,
    pub tunnel_address: Option<String>,
    pub tunnel_port: Option<i32>,
    pub target_address: Option<String>,
    pub target_port: Option<i32>,
    pub tls_mode: String,
    pub log_level: String,
    pub password: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub mode: Option<String>,
    pub read: Option<String>,
    pub rate: Option<String>,
    pub restart: Option<bool>,
    pub status: String,
    pub tcp_rx: i64,
    pub tcp_tx: i64,
    pub udp_rx: i64,
    pub udp_tx: i64,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub last_event_time: String,
    pub command_line: Option<String>,
    pub peer_sid: Option<String>,
    pub peer_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable payload for a create/initial-fallback upsert. Every field
/// here is also the set of "mutable columns" the upsert's conflict
/// resolution writes on a repeat insert, with the exception of
/// `created_at`, which the upsert deliberately leaves alone.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tunnels)]
pub struct NewTunnelRow {
    pub endpoint_id: i64,
    pub instance_id: String,
    pub name: Option<String>,
    pub tunnel_type: String,
    pub tunnel_address: Option<String>,
    pub tunnel_port: Option<i32>,
    pub target_address: Option<String>,
    pub target_port: Option<i32>,
    pub tls_mode: String,
    pub log_level: String,
    pub password: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub mode: Option<String>,
    pub read: Option<String>,
    pub rate: Option<String>,
    pub restart: Option<bool>,
    pub status: String,
    pub tcp_rx: i64,
    pub tcp_tx: i64,
    pub udp_rx: i64,
    pub udp_tx: i64,
    pub ping: Option<i64>,
    pub pool: Option<i64>,
    pub tcps: Option<i64>,
    pub udps: Option<i64>,
    pub last_event_time: String,
    pub command_line: Option<String>,
    pub peer_sid: Option<String>,
    pub peer_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = services)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ServiceRow {
    pub sid: String,
    #[diesel(column_name = "type_")]
    pub peer_type: String,
    pub local_endpoint_id: i64,
    pub local_instance_id: String,
    pub peer_endpoint_id: Option<i64>,
    pub peer_instance_id: Option<String>,
    pub total_rx: i64,
    pub total_tx: i64,
    pub sorts: i32,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = service_history)]
pub struct NewServiceHistoryRow {
    pub endpoint_id: i64,
    pub instance_id: String,
    pub record_time: String,
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

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = service_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ServiceHistoryRow {
    pub id: i64,
    pub endpoint_id: i64,
    pub instance_id: String,
    pub record_time: String,
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

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tunnel_operation_logs)]
pub struct NewOperationLogRow {
    pub tunnel_id: i64,
    pub endpoint_id: i64,
    pub instance_id: String,
    pub action: String,
    pub message: Option<String>,
    pub created_at: String,
}
