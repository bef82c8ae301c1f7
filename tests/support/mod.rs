//! Shared harness wiring a real dispatcher/processor/persistence/history
//! pipeline over an in-memory SQLite store, so integration tests can feed
//! raw SSE payload strings exactly as an `EndpointConnection` would and
//! observe the database/history side effects, without any network access.

use std::sync::Arc;
use std::time::Duration;

use nodepassdash_core::broadcast::Broadcaster;
use nodepassdash_core::config::QueuesConfig;
use nodepassdash_core::db::create_pool;
use nodepassdash_core::dispatch::{DispatcherHandle, EventDispatcher, RawJob};
use nodepassdash_core::domain::EndpointId;
use nodepassdash_core::filelog::NullLogSink;
use nodepassdash_core::history::HistoryWorker;
use nodepassdash_core::persistence::batch_buffer::BatchInsertBuffer;
use nodepassdash_core::persistence::batch_queue::BatchInsertQueue;
use nodepassdash_core::persistence::optimized_store::OptimizedStore;
use nodepassdash_core::persistence::StoreQueue;
use nodepassdash_core::processor::EventProcessor;
use nodepassdash_core::remote::NullControlPlane;
use nodepassdash_core::store::sqlite::SqliteStore;

use diesel::prelude::*;
use nodepassdash_core::db::model::NewEndpointRow;
use nodepassdash_core::db::schema::endpoints;

/// Seed one `endpoints` row directly, standing in for the external
/// management API that owns endpoint creation.
pub fn seed_endpoint(store: &SqliteStore, id: i64, url: &str, status: &str) {
    let mut conn = store.pool().get().expect("pool connection");
    let now = chrono::Utc::now().to_rfc3339();
    let row = NewEndpointRow {
        id,
        url: url.to_string(),
        api_path: "/api".to_string(),
        api_key: "test-key".to_string(),
        status: status.to_string(),
        tunnel_count: 0,
        created_at: now.clone(),
        updated_at: now,
    };
    diesel::insert_into(endpoints::table).values(&row).execute(&mut conn).expect("seed endpoint");
}

/// A fully wired pipeline: raw JSON in, `SqliteStore` rows out. Mirrors
/// the real `main::run` wiring minus the connection manager (C1/C2), which
/// the scripted tests below stand in for by calling [`Pipeline::feed`]
/// directly on the dispatcher's raw-job queue.
pub struct Pipeline {
    pub store: Arc<SqliteStore>,
    pub broadcaster: Arc<Broadcaster>,
    dispatcher: DispatcherHandle,
    batch_buffer: Arc<BatchInsertBuffer>,
    optimized: OptimizedStore,
}

impl Pipeline {
    pub async fn new() -> Self {
        let pool = create_pool(":memory:", 1).expect("in-memory pool");
        let store = Arc::new(SqliteStore::new(pool));
        let queues = QueuesConfig::default();

        let mut optimized = OptimizedStore::new(store.clone(), queues.optimized_store_threshold);
        let optimized_handle = optimized.handle();
        optimized.spawn_collector();

        let mut batch_queue = BatchInsertQueue::new(queues.batch_insert_capacity);
        let batch_queue_handle = batch_queue.handle();
        let batch_buffer = Arc::new(BatchInsertBuffer::new(store.clone()));
        batch_queue.spawn_consumer(batch_buffer.clone());

        let mut store_queue = StoreQueue::new(&queues, 2);
        let store_queue_handle = store_queue.handle();
        store_queue.spawn_workers(store.clone(), Arc::new(NullLogSink), batch_queue_handle, optimized_handle);

        let mut history_worker = HistoryWorker::new(queues.history_capacity);
        let history_handle = history_worker.handle();
        history_worker.spawn(store.clone());

        let broadcaster = Arc::new(Broadcaster::new());

        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store_queue_handle,
            history_handle,
            broadcaster.clone(),
            Arc::new(NullControlPlane),
            true,
        ));

        let mut dispatcher = EventDispatcher::new(&queues, 2);
        let dispatcher_handle = dispatcher.handle();
        dispatcher.spawn_workers(processor);

        Self { store, broadcaster, dispatcher: dispatcher_handle, batch_buffer, optimized }
    }

    /// Feed one raw `data:` payload string for `endpoint_id`, exactly as
    /// `EndpointConnection::forward_event` hands frames to C3.
    pub fn feed(&self, endpoint_id: EndpointId, payload: &str) {
        self.dispatcher.enqueue(RawJob { endpoint_id, payload: payload.to_string() });
    }

    /// Force both C5 buffers to flush immediately instead of waiting for
    /// their timers, so tests don't need multi-hundred-ms sleeps.
    pub async fn flush_persistence(&self) {
        self.batch_buffer.flush().await;
        self.optimized.flush_now().await;
    }

    /// Give the worker pools a moment to drain the queues.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(80)).await;
        self.flush_persistence().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub fn initial_event(id: &str, url: &str, time: &str, tcprx: i64) -> String {
    format!(
        r#"{{"type":"initial","time":"{time}","instance":{{
            "id":"{id}","url":"{url}","type":"client","status":"running",
            "tcprx":{tcprx},"tcptx":0,"udprx":0,"udptx":0
        }},"logs":null}}"#
    )
}

pub fn update_event(id: &str, url: &str, time: &str, tcprx: i64) -> String {
    format!(
        r#"{{"type":"update","time":"{time}","instance":{{
            "id":"{id}","url":"{url}","type":"client","status":"running",
            "tcprx":{tcprx},"tcptx":0,"udprx":0,"udptx":0
        }},"logs":null}}"#
    )
}

pub fn create_event(id: &str, url: &str, time: &str) -> String {
    format!(
        r#"{{"type":"create","time":"{time}","instance":{{
            "id":"{id}","url":"{url}","type":"client","status":"running",
            "tcprx":0,"tcptx":0,"udprx":0,"udptx":0
        }},"logs":null}}"#
    )
}

pub fn delete_event(id: &str, url: &str, time: &str) -> String {
    format!(
        r#"{{"type":"delete","time":"{time}","instance":{{
            "id":"{id}","url":"{url}","type":"client","status":"running",
            "tcprx":0,"tcptx":0,"udprx":0,"udptx":0
        }},"logs":null}}"#
    )
}

pub fn shutdown_event(time: &str) -> String {
    format!(r#"{{"type":"shutdown","time":"{time}","instance":null,"logs":null}}"#)
}
