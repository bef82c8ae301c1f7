//! Event Processor (C4): per-event-kind handlers driving tunnel lifecycle
//! transitions, persistence, history, and downstream fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock as SyncRwLock;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::broadcast::Broadcaster;
use crate::domain::{
    classify_peer_type, parse_instance_url, EndpointId, EndpointStatus, EventKind, InstancePayload,
    MonitoringData, ParsedEvent, PeerTypeClass, Service, Tunnel, TunnelKey, TunnelStatus, TunnelType,
};
use crate::error::Result;
use crate::history::HistoryHandle;
use crate::notify::ManagerNotifier;
use crate::persistence::{StoreJob, StoreQueueHandle};
use crate::remote::RemoteControlPlane;
use crate::store::{EndpointStore, ServiceStore, TunnelRuntimeUpdate, TunnelStore};

/// Build the tunnel's full row from a lifecycle (`initial`-fallback or
/// `create`) event: URL-derived addressing/options plus the embedded
/// counters.
fn tunnel_from_event(key: &TunnelKey, instance: &InstancePayload, time: DateTime<Utc>) -> Result<Tunnel> {
    let parsed_url = instance.url.as_deref().map(parse_instance_url).transpose()?;
    let peer = instance.meta.as_ref().and_then(|m| m.peer.as_ref());

    Ok(Tunnel {
        endpoint_id: key.endpoint_id,
        instance_id: key.instance_id.clone(),
        name: instance.alias.clone(),
        tunnel_type: instance
            .instance_type
            .as_deref()
            .and_then(TunnelType::parse)
            .unwrap_or(TunnelType::Server),
        tunnel_address: parsed_url.as_ref().and_then(|p| p.tunnel_address.clone()),
        tunnel_port: parsed_url.as_ref().and_then(|p| p.tunnel_port),
        target_address: parsed_url.as_ref().and_then(|p| p.target_address.clone()),
        target_port: parsed_url.as_ref().and_then(|p| p.target_port),
        tls_mode: parsed_url.as_ref().map(|p| p.tls_mode).unwrap_or_default(),
        log_level: parsed_url.as_ref().map(|p| p.log_level.clone()).unwrap_or_else(|| "inherit".to_string()),
        password: parsed_url.as_ref().and_then(|p| p.password.clone()),
        min: parsed_url.as_ref().and_then(|p| p.min.clone()),
        max: parsed_url.as_ref().and_then(|p| p.max.clone()),
        mode: parsed_url.as_ref().and_then(|p| p.mode.clone()),
        read: parsed_url.as_ref().and_then(|p| p.read.clone()),
        rate: parsed_url.as_ref().and_then(|p| p.rate.clone()),
        restart: instance.restart,
        status: instance.status.as_deref().and_then(TunnelStatus::parse).unwrap_or(TunnelStatus::Stopped),
        tcp_rx: instance.tcprx,
        tcp_tx: instance.tcptx,
        udp_rx: instance.udprx,
        udp_tx: instance.udptx,
        ping: instance.ping,
        pool: instance.pool,
        tcps: instance.tcps,
        udps: instance.udps,
        last_event_time: time,
        command_line: instance.url.clone(),
        peer_sid: peer.and_then(|p| p.sid.clone()),
        peer_type: peer.and_then(|p| p.peer_type.clone()),
    })
}

/// Build the mutable-column set a runtime-info update is allowed to
/// touch: counters, status, restart, peer/service sid, plus the
/// URL-derived network fields and command_line.
fn runtime_update_from_instance(instance: &InstancePayload, time: DateTime<Utc>) -> Result<TunnelRuntimeUpdate> {
    let parsed_url = instance.url.as_deref().map(parse_instance_url).transpose()?;
    let peer = instance.meta.as_ref().and_then(|m| m.peer.as_ref());

    Ok(TunnelRuntimeUpdate {
        status: instance.status.as_deref().and_then(TunnelStatus::parse).map(|s| s.as_str().to_string()),
        restart: instance.restart,
        tcp_rx: Some(instance.tcprx),
        tcp_tx: Some(instance.tcptx),
        udp_rx: Some(instance.udprx),
        udp_tx: Some(instance.udptx),
        ping: instance.ping,
        pool: instance.pool,
        tcps: instance.tcps,
        udps: instance.udps,
        command_line: instance.url.clone(),
        peer_sid: peer.and_then(|p| p.sid.clone()),
        peer_type: peer.and_then(|p| p.peer_type.clone()),
        tunnel_address: parsed_url.as_ref().and_then(|p| p.tunnel_address.clone()),
        tunnel_port: parsed_url.as_ref().and_then(|p| p.tunnel_port),
        target_address: parsed_url.as_ref().and_then(|p| p.target_address.clone()),
        target_port: parsed_url.as_ref().and_then(|p| p.target_port),
        tls_mode: parsed_url.as_ref().map(|p| p.tls_mode.as_str().to_string()),
        log_level: parsed_url.as_ref().map(|p| p.log_level.clone()),
        last_event_time: time,
    })
}

fn event_payload(event: &ParsedEvent) -> Value {
    json!({
        "type": event.kind.as_str(),
        "time": event.time.to_rfc3339(),
        "endpoint_id": event.endpoint_id.0,
        "instance": event.instance,
        "logs": event.logs,
    })
}

/// Per-event-kind handlers mutating tunnel state and fanning out to
/// persistence (C5), history (C6), and the downstream broadcaster (C7).
///
/// `last_event_cache` and `service_cache` are explicitly owned fields
/// with a documented lifecycle (populated lazily from the store on first
/// touch per key, never read before that seed), not ambient statics.
pub struct EventProcessor {
    tunnel_store: Arc<dyn TunnelStore>,
    endpoint_store: Arc<dyn EndpointStore>,
    service_store: Arc<dyn ServiceStore>,
    store_queue: StoreQueueHandle,
    history: HistoryHandle,
    broadcaster: Arc<Broadcaster>,
    remote: Arc<dyn RemoteControlPlane>,
    notifier: SyncRwLock<Option<Arc<dyn ManagerNotifier>>>,
    last_event_cache: DashMap<TunnelKey, DateTime<Utc>>,
    service_cache: Option<DashMap<(String, String), Service>>,
}

impl EventProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tunnel_store: Arc<dyn TunnelStore>,
        endpoint_store: Arc<dyn EndpointStore>,
        service_store: Arc<dyn ServiceStore>,
        store_queue: StoreQueueHandle,
        history: HistoryHandle,
        broadcaster: Arc<Broadcaster>,
        remote: Arc<dyn RemoteControlPlane>,
        enable_service_cache: bool,
    ) -> Self {
        Self {
            tunnel_store,
            endpoint_store,
            service_store,
            store_queue,
            history,
            broadcaster,
            remote,
            notifier: SyncRwLock::new(None),
            last_event_cache: DashMap::new(),
            service_cache: enable_service_cache.then(DashMap::new),
        }
    }

    /// Setter-based injection: the notifier is optional at construction so
    /// C2 (which owns the processor's only consumer-facing handle) can
    /// wire itself in after both sides exist.
    pub fn set_notifier(&self, notifier: Arc<dyn ManagerNotifier>) {
        *self.notifier.write() = Some(notifier);
    }

    pub async fn handle(&self, event: ParsedEvent) {
        let result = match &event.kind {
            EventKind::Shutdown => self.handle_shutdown(&event).await,
            EventKind::Initial => self.handle_initial(&event).await,
            EventKind::Create => self.handle_create(&event).await,
            EventKind::Update => self.handle_update(&event).await,
            EventKind::Delete => self.handle_delete(&event).await,
            EventKind::Log => self.handle_log(&event).await,
            EventKind::Unknown(kind) => {
                debug!(kind = %kind, "unknown event kind reached processor, dropping");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!(error = %e, kind = event.kind.as_str(), endpoint_id = %event.endpoint_id, "event handler failed");
        }
    }

    async fn set_endpoint_status(&self, endpoint_id: EndpointId, status: EndpointStatus) -> Result<()> {
        // Conditional write: only persist when the status actually
        // changes, to avoid write storms on every event. A lookup failure
        // degrades to an unconditional write rather than silently
        // skipping a real transition.
        let current = self.endpoint_store.get(endpoint_id).await?;
        let changed = !matches!(&current, Some(e) if e.status == status);
        if changed {
            self.endpoint_store.set_status(endpoint_id, status).await?;
            if let Some(notifier) = self.notifier.read().clone() {
                notifier.notify_endpoint_status_changed(endpoint_id, status).await;
            }
        }
        Ok(())
    }

    async fn handle_shutdown(&self, event: &ParsedEvent) -> Result<()> {
        self.set_endpoint_status(event.endpoint_id, EndpointStatus::Offline).await?;
        self.tunnel_store.mark_offline_by_endpoint(event.endpoint_id).await?;

        self.broadcaster.send_global_update(&json!({
            "type": "endpoint_shutdown",
            "endpoint_id": event.endpoint_id.0,
        }));

        Ok(())
    }

    async fn handle_initial(&self, event: &ParsedEvent) -> Result<()> {
        let Some(instance) = &event.instance else {
            warn!(endpoint_id = %event.endpoint_id, "initial event missing instance payload, dropping");
            return Ok(());
        };

        if instance.instance_type.as_deref().unwrap_or("").is_empty() {
            let endpoint_id = event.endpoint_id;
            let remote = self.remote.clone();
            tokio::spawn(async move {
                if let Err(e) = remote.fetch_system_info(endpoint_id).await {
                    error!(error = %e, %endpoint_id, "system-info fetch failed");
                }
            });
            return Ok(());
        }

        let key = TunnelKey::new(event.endpoint_id, instance.id.clone().into());

        if self.tunnel_store.get(&key).await?.is_some() {
            self.apply_runtime_info_update(&key, instance, event.time).await?;
        } else {
            let tunnel = tunnel_from_event(&key, instance, event.time)?;
            self.store_queue.enqueue(StoreJob::Upsert(tunnel));
        }

        Ok(())
    }

    async fn handle_create(&self, event: &ParsedEvent) -> Result<()> {
        let Some(instance) = &event.instance else {
            warn!(endpoint_id = %event.endpoint_id, "create event missing instance payload, dropping");
            return Ok(());
        };

        let key = TunnelKey::new(event.endpoint_id, instance.id.clone().into());
        let tunnel = tunnel_from_event(&key, instance, event.time)?;
        self.last_event_cache.insert(key.clone(), event.time);
        self.store_queue.enqueue(StoreJob::Upsert(tunnel.clone()));
        self.upsert_service(&tunnel).await;

        Ok(())
    }

    async fn handle_update(&self, event: &ParsedEvent) -> Result<()> {
        let Some(instance) = &event.instance else {
            warn!(endpoint_id = %event.endpoint_id, "update event missing instance payload, dropping");
            return Ok(());
        };

        let key = TunnelKey::new(event.endpoint_id, instance.id.clone().into());

        let Some(existing) = self.tunnel_store.get(&key).await? else {
            warn!(%key, "update for unknown tunnel (timing race with create), dropping");
            return Ok(());
        };

        if !self.apply_runtime_info_update(&key, instance, event.time).await? {
            return Ok(());
        }

        self.history.push(MonitoringData {
            endpoint_id: key.endpoint_id,
            instance_id: key.instance_id.clone(),
            tcp_in: instance.tcprx,
            tcp_out: instance.tcptx,
            udp_in: instance.udprx,
            udp_out: instance.udptx,
            ping: instance.ping,
            pool: instance.pool,
            tcps: instance.tcps,
            udps: instance.udps,
            timestamp: event.time,
        });

        let peer = instance.meta.as_ref().and_then(|m| m.peer.as_ref());
        let mut updated = existing;
        updated.tcp_rx = instance.tcprx;
        updated.tcp_tx = instance.tcptx;
        updated.udp_rx = instance.udprx;
        updated.udp_tx = instance.udptx;
        updated.peer_sid = peer.and_then(|p| p.sid.clone()).or(updated.peer_sid);
        updated.peer_type = peer.and_then(|p| p.peer_type.clone()).or(updated.peer_type);
        self.upsert_service(&updated).await;

        self.broadcaster.send_tunnel_update(&key.instance_id.0, &event_payload(event));

        Ok(())
    }

    async fn handle_delete(&self, event: &ParsedEvent) -> Result<()> {
        let Some(instance) = &event.instance else {
            warn!(endpoint_id = %event.endpoint_id, "delete event missing instance payload, dropping");
            return Ok(());
        };

        let key = TunnelKey::new(event.endpoint_id, instance.id.clone().into());
        self.tunnel_store.delete_cascade(&key).await?;
        self.endpoint_store.refresh_tunnel_count(event.endpoint_id).await?;
        self.last_event_cache.remove(&key);

        self.broadcaster.send_tunnel_update(&key.instance_id.0, &event_payload(event));

        Ok(())
    }

    async fn handle_log(&self, event: &ParsedEvent) -> Result<()> {
        let Some(instance) = &event.instance else {
            return Ok(());
        };
        let key = TunnelKey::new(event.endpoint_id, instance.id.clone().into());

        if let Some(logs) = &event.logs {
            if !logs.is_empty() {
                self.store_queue.enqueue(StoreJob::Log(key.clone(), logs.clone()));
            }
        }

        self.broadcaster.send_tunnel_update(&key.instance_id.0, &event_payload(event));

        Ok(())
    }

    /// Apply a runtime-info update under the last-event-time ordering
    /// guard. Returns `false` if the event was discarded as stale.
    async fn apply_runtime_info_update(
        &self,
        key: &TunnelKey,
        instance: &InstancePayload,
        time: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.check_and_record_order(key, time).await? {
            debug!(%key, "stale event discarded by ordering guard");
            return Ok(false);
        }

        let update = runtime_update_from_instance(instance, time)?;
        self.store_queue.enqueue(StoreJob::RuntimeUpdate(key.clone(), update));
        Ok(true)
    }

    /// Seeds `last_event_cache` from the store on first touch for a key,
    /// then enforces monotonicity purely in memory: a tunnel row only
    /// ever moves forward in time once the core has seen it.
    async fn check_and_record_order(&self, key: &TunnelKey, time: DateTime<Utc>) -> Result<bool> {
        if let Some(mut existing) = self.last_event_cache.get_mut(key) {
            return Ok(if time > *existing {
                *existing = time;
                true
            } else {
                false
            });
        }

        let persisted = self.tunnel_store.last_event_time(key).await?;
        let proceeds = persisted.map(|p| time > p).unwrap_or(true);
        self.last_event_cache.insert(key.clone(), if proceeds { time } else { persisted.unwrap_or(time) });
        Ok(proceeds)
    }

    /// Maintain the `(sid, type)` service row for a tunnel carrying a peer
    /// sid. A no-op for tunnels outside a service grouping.
    async fn upsert_service(&self, tunnel: &Tunnel) {
        let (Some(sid), Some(peer_type)) = (tunnel.peer_sid.clone(), tunnel.peer_type.clone()) else {
            return;
        };

        let Some(class) = classify_peer_type(&peer_type) else {
            warn!(peer_type = %peer_type, "unrecognized peer type, skipping service aggregation");
            return;
        };

        let (peer_endpoint_id, peer_instance_id, total_rx, total_tx) = match class {
            PeerTypeClass::SingleEnded => {
                (None, None, tunnel.tcp_rx + tunnel.udp_rx, tunnel.tcp_tx + tunnel.udp_tx)
            }
            PeerTypeClass::TwoEnded { opposite } => match self.tunnel_store.find_by_peer(&sid, opposite).await {
                Ok(Some(peer)) => (
                    Some(peer.endpoint_id),
                    Some(peer.instance_id.clone()),
                    tunnel.tcp_rx + tunnel.udp_rx + peer.tcp_rx + peer.udp_rx,
                    tunnel.tcp_tx + tunnel.udp_tx + peer.tcp_tx + peer.udp_tx,
                ),
                Ok(None) => (None, None, tunnel.tcp_rx + tunnel.udp_rx, tunnel.tcp_tx + tunnel.udp_tx),
                Err(e) => {
                    error!(error = %e, sid = %sid, "failed to join opposite-side tunnel for service aggregation");
                    (None, None, tunnel.tcp_rx + tunnel.udp_rx, tunnel.tcp_tx + tunnel.udp_tx)
                }
            },
        };

        let cache_key = (sid.clone(), peer_type.clone());
        let existing_sorts = match self.service_cache.as_ref().and_then(|c| c.get(&cache_key).map(|r| r.sorts)) {
            Some(sorts) => Some(sorts),
            None => match self.service_store.get(&sid, &peer_type).await {
                Ok(row) => row.map(|r| r.sorts),
                Err(e) => {
                    error!(error = %e, sid = %sid, "service lookup failed, falling back to direct upsert");
                    None
                }
            },
        };

        let sorts = match existing_sorts {
            Some(sorts) => sorts,
            None => match self.service_store.max_sorts().await {
                Ok(max) => max + 1,
                Err(e) => {
                    error!(error = %e, "max-sorts lookup failed, defaulting to 1");
                    1
                }
            },
        };

        let service = Service {
            sid,
            peer_type,
            local_endpoint_id: tunnel.endpoint_id,
            local_instance_id: tunnel.instance_id.clone(),
            peer_endpoint_id,
            peer_instance_id,
            total_rx,
            total_tx,
            sorts,
            updated_at: Utc::now(),
        };

        if let Some(cache) = &self.service_cache {
            cache.insert(cache_key, service.clone());
        }

        if let Err(e) = self.service_store.upsert(&service).await {
            error!(error = %e, sid = %service.sid, "service upsert failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::domain::SseEnvelope;
    use crate::filelog::NullLogSink;
    use crate::history::HistoryWorker;
    use crate::persistence::StoreQueue;
    use crate::remote::NullControlPlane;
    use crate::store::sqlite::SqliteStore;

    fn envelope(json: &str) -> ParsedEvent {
        let envelope: SseEnvelope = serde_json::from_str(json).unwrap();
        ParsedEvent::from_envelope(EndpointId(7), envelope)
    }

    async fn processor() -> (Arc<EventProcessor>, Arc<SqliteStore>) {
        let pool = create_pool(":memory:", 1).unwrap();
        let store = Arc::new(SqliteStore::new(pool));

        let mut store_queue = StoreQueue::new(&crate::config::QueuesConfig::default(), 1);
        let store_queue_handle = store_queue.handle();

        let mut optimized = crate::persistence::optimized_store::OptimizedStore::new(store.clone(), 1000);
        let optimized_handle = optimized.handle();
        optimized.spawn_collector();

        let mut batch_queue = crate::persistence::batch_queue::BatchInsertQueue::new(5_000);
        let batch_queue_handle = batch_queue.handle();
        let batch_buffer = Arc::new(crate::persistence::batch_buffer::BatchInsertBuffer::new(store.clone()));
        batch_queue.spawn_consumer(batch_buffer);

        store_queue.spawn_workers(store.clone(), Arc::new(NullLogSink), batch_queue_handle, optimized_handle);

        let mut history_worker = HistoryWorker::new(100);
        let history_handle = history_worker.handle();
        history_worker.spawn(store.clone());

        let broadcaster = Arc::new(Broadcaster::new());

        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store_queue_handle,
            history_handle,
            broadcaster,
            Arc::new(NullControlPlane),
            true,
        ));

        // Seed endpoint 7 for status-transition handlers.
        let conn_store: Arc<dyn EndpointStore> = store.clone();
        let _ = conn_store; // endpoint row seeded via raw insert below
        (processor, store)
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn s1_first_connect_inserts_tunnel() {
        let (processor, store) = processor().await;

        let event = envelope(
            r#"{"type":"initial","time":"2024-05-01T12:00:00Z","instance":{
                "id":"i1","url":"client://:5000/10.0.0.1:80?log=info",
                "type":"client","status":"running","tcprx":100,"tcptx":0,"udprx":0,"udptx":0
            },"logs":null}"#,
        );
        processor.handle(event).await;
        settle().await;

        let key = TunnelKey::new(EndpointId(7), "i1".into());
        let tunnel = store.get(&key).await.unwrap().expect("tunnel inserted");
        assert_eq!(tunnel.tcp_rx, 100);
        assert_eq!(tunnel.target_address, Some("10.0.0.1".to_string()));
        assert_eq!(tunnel.log_level, "info");
    }

    #[tokio::test]
    async fn s2_out_of_order_update_is_discarded() {
        let (processor, store) = processor().await;
        let key = TunnelKey::new(EndpointId(7), "i1".into());

        processor
            .handle(envelope(
                r#"{"type":"create","time":"2024-05-01T12:00:00Z","instance":{
                    "id":"i1","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":0,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        processor
            .handle(envelope(
                r#"{"type":"update","time":"2024-05-01T12:00:02Z","instance":{
                    "id":"i1","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":300,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        processor
            .handle(envelope(
                r#"{"type":"update","time":"2024-05-01T12:00:01Z","instance":{
                    "id":"i1","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":200,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        let tunnel = store.get(&key).await.unwrap().unwrap();
        assert_eq!(tunnel.tcp_rx, 300);
    }

    #[tokio::test]
    async fn update_for_unknown_tunnel_is_dropped() {
        let (processor, store) = processor().await;

        processor
            .handle(envelope(
                r#"{"type":"update","time":"2024-05-01T12:00:00Z","instance":{
                    "id":"ghost","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":1,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        let key = TunnelKey::new(EndpointId(7), "ghost".into());
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn service_aggregation_sums_two_ended_counters() {
        let (processor, store) = processor().await;

        processor
            .handle(envelope(
                r#"{"type":"create","time":"2024-05-01T12:00:00Z","instance":{
                    "id":"server-1","url":"server://:9000/10.0.0.1:80","type":"server","status":"running",
                    "tcprx":10,"tcptx":20,"udprx":0,"udptx":0,
                    "meta":{"peer":{"sid":"svc-1","type":"1"}}
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        processor
            .handle(envelope(
                r#"{"type":"create","time":"2024-05-01T12:00:00Z","instance":{
                    "id":"client-1","url":"client://:9001/10.0.0.2:80","type":"client","status":"running",
                    "tcprx":5,"tcptx":7,"udprx":0,"udptx":0,
                    "meta":{"peer":{"sid":"svc-1","type":"2"}}
                },"logs":null}"#,
            ))
            .await;
        settle().await;

        let service = store.get("svc-1", "2").await.unwrap().expect("service row");
        assert_eq!(service.total_rx, 15);
        assert_eq!(service.total_tx, 27);
    }

    #[tokio::test]
    async fn delete_removes_tunnel_and_refreshes_count() {
        let (processor, store) = processor().await;
        let key = TunnelKey::new(EndpointId(7), "i1".into());

        processor
            .handle(envelope(
                r#"{"type":"create","time":"2024-05-01T12:00:00Z","instance":{
                    "id":"i1","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":0,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;
        settle().await;
        assert!(store.get(&key).await.unwrap().is_some());

        processor
            .handle(envelope(
                r#"{"type":"delete","time":"2024-05-01T12:00:05Z","instance":{
                    "id":"i1","url":"client://:5000/10.0.0.1:80","type":"client","status":"running",
                    "tcprx":0,"tcptx":0,"udprx":0,"udptx":0
                },"logs":null}"#,
            ))
            .await;

        assert!(store.get(&key).await.unwrap().is_none());
    }
}
