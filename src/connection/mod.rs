//! Endpoint Connection (C1) and Connection Manager (C2).

pub mod sse_client;

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::TimersConfig;
use crate::dispatch::{DispatcherHandle, RawJob};
use crate::domain::{EndpointId, EndpointStatus};
use crate::notify::ManagerNotifier;
use crate::store::{EndpointStore, TunnelStore};

/// C1's state machine: `Idle -> Connecting -> Connected ->
/// Disconnected -> (Idle | ManuallyDisconnected)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    ManuallyDisconnected,
}

fn epoch_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// One long-lived SSE subscription to one remote master. Construction is
/// cheap; [`EndpointConnection::spawn`] starts the subscriber task.
pub struct EndpointConnection {
    pub endpoint_id: EndpointId,
    url: String,
    api_path: String,
    api_key: String,
    state: RwLock<ConnectionState>,
    manually_disconnected: AtomicBool,
    reconnect_attempts: AtomicU64,
    last_attempt_ms: AtomicI64,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Collaborators an [`EndpointConnection`]'s subscriber task needs, bundled
/// so `spawn` doesn't take an unwieldy parameter list.
#[derive(Clone)]
pub struct ConnectionDeps {
    pub client: reqwest::Client,
    pub endpoint_store: Arc<dyn EndpointStore>,
    pub tunnel_store: Arc<dyn TunnelStore>,
    pub dispatcher: DispatcherHandle,
    pub first_event_timeout: Duration,
}

impl EndpointConnection {
    pub fn new(endpoint_id: EndpointId, url: String, api_path: String, api_key: String) -> Arc<Self> {
        Arc::new(Self {
            endpoint_id,
            url,
            api_path,
            api_key,
            state: RwLock::new(ConnectionState::Idle),
            manually_disconnected: AtomicBool::new(false),
            reconnect_attempts: AtomicU64::new(0),
            last_attempt_ms: AtomicI64::new(0),
            task: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_manually_disconnected(&self) -> bool {
        self.manually_disconnected.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn last_connect_attempt(&self) -> Option<DateTime<Utc>> {
        let ms = self.last_attempt_ms.load(Ordering::Relaxed);
        (ms != 0).then(|| DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now))
    }

    fn events_url(&self) -> String {
        format!("{}{}/events", self.url.trim_end_matches('/'), self.api_path)
    }

    /// Drive a conditional endpoint-status write (skip it when the stored
    /// status already matches, to avoid write storms), marking tunnels
    /// offline on the terminal statuses.
    async fn transition_endpoint(&self, deps: &ConnectionDeps, status: EndpointStatus) {
        let current = match deps.endpoint_store.get(self.endpoint_id).await {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, endpoint_id = %self.endpoint_id, "endpoint lookup failed during status transition");
                return;
            }
        };

        if matches!(&current, Some(e) if e.status == status) {
            return;
        }

        if let Err(e) = deps.endpoint_store.set_status(self.endpoint_id, status).await {
            error!(error = %e, endpoint_id = %self.endpoint_id, "endpoint status write failed");
        }

        if matches!(status, EndpointStatus::Fail | EndpointStatus::Disconnect) {
            if let Err(e) = deps.tunnel_store.mark_offline_by_endpoint(self.endpoint_id).await {
                error!(error = %e, endpoint_id = %self.endpoint_id, "failed to mark tunnels offline");
            }
        }
    }

    /// Spawn the subscriber task: one connect-and-read pass. On failure or
    /// stream end, the connection parks in `Disconnected`; re-driving it is
    /// the reconnect daemon's job, not this task's.
    pub fn spawn(self: &Arc<Self>, deps: ConnectionDeps) {
        let this = self.clone();

        let handle = tokio::spawn(async move {
            *this.state.write() = ConnectionState::Connecting;
            this.last_attempt_ms.store(epoch_millis_now(), Ordering::Relaxed);

            let url = this.events_url();
            let stream = match sse_client::subscribe(&deps.client, &url, &this.api_key).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(error = %e, endpoint_id = %this.endpoint_id, "SSE subscribe failed");
                    this.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                    *this.state.write() = ConnectionState::Disconnected;
                    this.transition_endpoint(&deps, EndpointStatus::Fail).await;
                    return;
                }
            };
            tokio::pin!(stream);

            let first = tokio::time::timeout(deps.first_event_timeout, stream.next()).await;
            let first_event = match first {
                Ok(Some(event)) => event,
                Ok(None) => {
                    warn!(endpoint_id = %this.endpoint_id, "SSE stream closed before first event");
                    this.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                    *this.state.write() = ConnectionState::Disconnected;
                    this.transition_endpoint(&deps, EndpointStatus::Fail).await;
                    return;
                }
                Err(_) => {
                    warn!(endpoint_id = %this.endpoint_id, "no event within first-event timeout");
                    this.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                    *this.state.write() = ConnectionState::Disconnected;
                    this.transition_endpoint(&deps, EndpointStatus::Fail).await;
                    return;
                }
            };

            *this.state.write() = ConnectionState::Connected;
            this.reconnect_attempts.store(0, Ordering::Relaxed);
            this.transition_endpoint(&deps, EndpointStatus::Online).await;
            info!(endpoint_id = %this.endpoint_id, "endpoint connected");

            this.forward_event(&deps, first_event);

            while let Some(event) = stream.next().await {
                this.forward_event(&deps, event);
            }

            warn!(endpoint_id = %this.endpoint_id, "SSE stream ended");
            *this.state.write() = ConnectionState::Disconnected;
            this.transition_endpoint(&deps, EndpointStatus::Fail).await;
        });

        *self.task.lock() = Some(handle);
    }

    fn forward_event(
        &self,
        deps: &ConnectionDeps,
        event: Result<eventsource_stream::Event, eventsource_stream::EventStreamError<reqwest::Error>>,
    ) {
        match event {
            Ok(event) => deps.dispatcher.enqueue(RawJob { endpoint_id: self.endpoint_id, payload: event.data }),
            Err(e) => warn!(error = %e, endpoint_id = %self.endpoint_id, "SSE frame decode error"),
        }
    }

    /// Explicit disconnect: parks the connection in `ManuallyDisconnected`.
    /// Suppresses the reconnect daemon until `connect_endpoint` is called
    /// again for this endpoint.
    pub async fn disconnect(&self, deps: &ConnectionDeps) {
        self.manually_disconnected.store(true, Ordering::Relaxed);
        *self.state.write() = ConnectionState::ManuallyDisconnected;

        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }

        self.transition_endpoint(deps, EndpointStatus::Disconnect).await;
    }

    fn abort(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

/// Whether a parked connection is eligible for the reconnect daemon to
/// re-drive it: not manually disconnected, and at least `min_gap` since the
/// last attempt. A pure function so the eligibility rule is independently
/// testable without spinning up a real connection task.
fn reconnect_eligible(
    state: ConnectionState,
    manually_disconnected: bool,
    last_attempt: Option<DateTime<Utc>>,
    min_gap: Duration,
    now: DateTime<Utc>,
) -> bool {
    if manually_disconnected || state == ConnectionState::Connected || state == ConnectionState::Connecting {
        return false;
    }
    match last_attempt {
        Some(last) => now.signed_duration_since(last).num_milliseconds() >= min_gap.as_millis() as i64,
        None => true,
    }
}

/// Snapshot of one connection's observable state, returned by
/// [`ConnectionManager::connection_status`].
#[derive(Debug, Clone)]
pub struct ConnectionStatusSnapshot {
    pub endpoint_id: EndpointId,
    pub state: ConnectionState,
    pub manually_disconnected: bool,
    pub reconnect_attempts: u64,
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Owns the set of C1 connections and the two daemons that keep them
/// healthy.
pub struct ConnectionManager {
    endpoint_store: Arc<dyn EndpointStore>,
    tunnel_store: Arc<dyn TunnelStore>,
    dispatcher: DispatcherHandle,
    client: reqwest::Client,
    timers: TimersConfig,
    connections: DashMap<EndpointId, Arc<EndpointConnection>>,
    daemons: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        endpoint_store: Arc<dyn EndpointStore>,
        tunnel_store: Arc<dyn TunnelStore>,
        dispatcher: DispatcherHandle,
        timers: TimersConfig,
    ) -> Result<Arc<Self>, crate::error::Error> {
        let client = sse_client::build_client()?;
        Ok(Arc::new(Self {
            endpoint_store,
            tunnel_store,
            dispatcher,
            client,
            timers,
            connections: DashMap::new(),
            daemons: Mutex::new(Vec::new()),
        }))
    }

    fn deps(&self) -> ConnectionDeps {
        ConnectionDeps {
            client: self.client.clone(),
            endpoint_store: self.endpoint_store.clone(),
            tunnel_store: self.tunnel_store.clone(),
            dispatcher: self.dispatcher.clone(),
            first_event_timeout: Duration::from_secs(self.timers.first_event_timeout_secs),
        }
    }

    /// Load every endpoint not excluded from startup and connect it, then
    /// start the reconnect and health daemons.
    pub async fn initialize_system(self: &Arc<Self>) -> Result<(), crate::error::Error> {
        let endpoints = self.endpoint_store.list().await?;

        for endpoint in endpoints {
            if endpoint.status.is_excluded_from_startup() {
                debug!(endpoint_id = %endpoint.id, status = ?endpoint.status, "skipping excluded endpoint at startup");
                continue;
            }
            self.connect_endpoint(endpoint.id, endpoint.url, endpoint.api_path, endpoint.api_key);
        }

        self.spawn_daemons();
        Ok(())
    }

    /// Start (or restart) a C1 for `endpoint_id`. At most one live
    /// connection per endpoint: an existing task is aborted first.
    pub fn connect_endpoint(self: &Arc<Self>, endpoint_id: EndpointId, url: String, api_path: String, api_key: String) {
        if let Some(existing) = self.connections.get(&endpoint_id) {
            existing.abort();
        }

        let connection = EndpointConnection::new(endpoint_id, url, api_path, api_key);
        connection.spawn(self.deps());
        self.connections.insert(endpoint_id, connection);
    }

    pub async fn disconnect_endpoint(&self, endpoint_id: EndpointId) {
        if let Some(connection) = self.connections.get(&endpoint_id) {
            connection.disconnect(&self.deps()).await;
        }
    }

    pub fn connection_status(&self) -> Vec<ConnectionStatusSnapshot> {
        self.connections
            .iter()
            .map(|entry| {
                let c = entry.value();
                ConnectionStatusSnapshot {
                    endpoint_id: c.endpoint_id,
                    state: c.state(),
                    manually_disconnected: c.is_manually_disconnected(),
                    reconnect_attempts: c.reconnect_attempts(),
                    last_attempt: c.last_connect_attempt(),
                }
            })
            .collect()
    }

    fn spawn_daemons(self: &Arc<Self>) {
        let mut daemons = self.daemons.lock();
        daemons.push(self.clone().spawn_reconnect_daemon());
        daemons.push(self.clone().spawn_health_daemon());
    }

    /// Ticks every `reconnect_interval_secs` (60s); re-drives any eligible
    /// parked connection.
    fn spawn_reconnect_daemon(self: Arc<Self>) -> JoinHandle<()> {
        let min_gap = Duration::from_secs(self.timers.min_reconnect_gap_secs);
        let interval = Duration::from_secs(self.timers.reconnect_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Utc::now();

                let candidates: Vec<(EndpointId, Arc<EndpointConnection>)> = self
                    .connections
                    .iter()
                    .filter(|entry| {
                        let c = entry.value();
                        reconnect_eligible(c.state(), c.is_manually_disconnected(), c.last_connect_attempt(), min_gap, now)
                    })
                    .map(|entry| (*entry.key(), entry.value().clone()))
                    .collect();

                for (endpoint_id, connection) in candidates {
                    debug!(%endpoint_id, "reconnect daemon re-driving connection");
                    connection.abort();
                    connection.spawn(self.deps());
                }
            }
        })
    }

    /// Ticks every `health_interval_secs` (30s); logs aggregate connection
    /// counts.
    fn spawn_health_daemon(self: Arc<Self>) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.timers.health_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                let (mut connected, mut disconnected, mut manual) = (0u32, 0u32, 0u32);
                for entry in self.connections.iter() {
                    match entry.value().state() {
                        ConnectionState::Connected => connected += 1,
                        ConnectionState::ManuallyDisconnected => manual += 1,
                        _ => disconnected += 1,
                    }
                }

                info!(connected, disconnected, manual, "connection health tick");
            }
        })
    }

    /// Cancel all daemons and every live connection.
    pub fn close(&self) {
        for handle in self.daemons.lock().drain(..) {
            handle.abort();
        }
        for entry in self.connections.iter() {
            entry.value().abort();
        }
    }
}

#[async_trait::async_trait]
impl ManagerNotifier for ConnectionManager {
    /// Narrow callback from C4's `ManagerNotifier`. The actual DB write
    /// already happened in the processor; this is an observability hook
    /// for the manager's own view of the transition.
    async fn notify_endpoint_status_changed(&self, endpoint_id: EndpointId, status: EndpointStatus) {
        debug!(%endpoint_id, ?status, "processor notified endpoint status change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_ineligible_while_connected_or_connecting() {
        let now = Utc::now();
        assert!(!reconnect_eligible(ConnectionState::Connected, false, None, Duration::from_secs(30), now));
        assert!(!reconnect_eligible(ConnectionState::Connecting, false, None, Duration::from_secs(30), now));
    }

    #[test]
    fn reconnect_ineligible_when_manually_disconnected() {
        let now = Utc::now();
        assert!(!reconnect_eligible(ConnectionState::Disconnected, true, None, Duration::from_secs(30), now));
    }

    #[test]
    fn reconnect_eligible_with_no_prior_attempt() {
        let now = Utc::now();
        assert!(reconnect_eligible(ConnectionState::Disconnected, false, None, Duration::from_secs(30), now));
    }

    #[test]
    fn reconnect_ineligible_within_min_gap() {
        let now = Utc::now();
        let last = now - chrono::Duration::seconds(10);
        assert!(!reconnect_eligible(ConnectionState::Disconnected, false, Some(last), Duration::from_secs(30), now));
    }

    #[test]
    fn reconnect_eligible_past_min_gap() {
        let now = Utc::now();
        let last = now - chrono::Duration::seconds(31);
        assert!(reconnect_eligible(ConnectionState::Disconnected, false, Some(last), Duration::from_secs(30), now));
    }

    #[test]
    fn new_connection_starts_idle_and_unattempted() {
        let conn = EndpointConnection::new(EndpointId(1), "https://m1".into(), "/api".into(), "key".into());
        assert_eq!(conn.state(), ConnectionState::Idle);
        assert!(!conn.is_connected());
        assert!(!conn.is_manually_disconnected());
        assert_eq!(conn.reconnect_attempts(), 0);
        assert!(conn.last_connect_attempt().is_none());
    }

    #[test]
    fn events_url_joins_base_path_and_suffix() {
        let conn = EndpointConnection::new(EndpointId(1), "https://m1/".into(), "/api".into(), "key".into());
        assert_eq!(conn.events_url(), "https://m1/api/events");
    }
}
