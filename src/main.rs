mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tabled::{Table, Tabled};
use tracing::{error, info};

use diesel::prelude::*;

use nodepassdash_core::broadcast::Broadcaster;
use nodepassdash_core::config::Config;
use nodepassdash_core::connection::ConnectionManager;
use nodepassdash_core::db;
use nodepassdash_core::db::model::NewEndpointRow;
use nodepassdash_core::db::schema::endpoints;
use nodepassdash_core::dispatch::EventDispatcher;
use nodepassdash_core::filelog::NullLogSink;
use nodepassdash_core::history::HistoryWorker;
use nodepassdash_core::notify::ManagerNotifier;
use nodepassdash_core::persistence::batch_buffer::BatchInsertBuffer;
use nodepassdash_core::persistence::batch_queue::BatchInsertQueue;
use nodepassdash_core::persistence::optimized_store::OptimizedStore;
use nodepassdash_core::persistence::StoreQueue;
use nodepassdash_core::processor::EventProcessor;
use nodepassdash_core::remote::NullControlPlane;
use nodepassdash_core::store::sqlite::SqliteStore;
use nodepassdash_core::store::EndpointStore;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run(&cli.config).await,
        Commands::Status => status(&cli.config).await,
        Commands::Migrate => migrate(&cli.config).await,
        Commands::Seed => seed(&cli.config).await,
    };

    if let Err(e) = result {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}

/// Per §7: only startup DB open failures are fatal. Everything spawned
/// after this point logs and continues rather than aborting the process.
async fn run(config_path: &std::path::Path) -> nodepassdash_core::Result<()> {
    let config = Config::load(config_path)?;
    config.init_logging();
    info!("nodepassdash-core starting");

    let pool = db::create_pool(&config.database.url, config.database.max_pool_size)?;
    let store: Arc<SqliteStore> = Arc::new(SqliteStore::new(pool));

    let mut optimized_store = OptimizedStore::new(store.clone(), config.queues.optimized_store_threshold);
    let optimized_handle = optimized_store.handle();
    optimized_store.spawn_collector();
    optimized_store.spawn_hourly_timer(Duration::from_secs(config.timers.optimized_flush_interval_secs));

    let mut batch_queue = BatchInsertQueue::new(config.queues.batch_insert_capacity);
    let batch_queue_handle = batch_queue.handle();
    let batch_buffer = Arc::new(BatchInsertBuffer::new(store.clone()));
    batch_queue.spawn_consumer(batch_buffer.clone());
    batch_buffer.spawn_flush_timer(Duration::from_millis(config.timers.batch_flush_interval_ms));

    let mut store_queue = StoreQueue::new(&config.queues, config.workers.store_workers);
    let store_queue_handle = store_queue.handle();
    store_queue.spawn_workers(store.clone(), Arc::new(NullLogSink), batch_queue_handle, optimized_handle);

    let mut history_worker = HistoryWorker::new(config.queues.history_capacity);
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

    let mut dispatcher = EventDispatcher::new(&config.queues, config.workers.dispatcher_workers);
    let dispatcher_handle = dispatcher.handle();
    dispatcher.spawn_workers(processor.clone());

    let connection_manager = ConnectionManager::new(store.clone(), store.clone(), dispatcher_handle, config.timers.clone())?;
    processor.set_notifier(connection_manager.clone() as Arc<dyn ManagerNotifier>);

    connection_manager.initialize_system().await?;
    info!("ingestion pipeline running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutdown signal received, draining buffers");
    connection_manager.close();
    batch_buffer.flush().await;
    optimized_store.flush_now().await;

    info!("nodepassdash-core stopped");
    Ok(())
}

#[derive(Tabled)]
struct EndpointRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Tunnels")]
    tunnel_count: i64,
}

async fn status(config_path: &std::path::Path) -> nodepassdash_core::Result<()> {
    let config = Config::load(config_path)?;
    let pool = db::create_pool(&config.database.url, 1)?;
    let store = SqliteStore::new(pool);

    let endpoints = store.list().await?;
    let rows: Vec<EndpointRow> = endpoints
        .iter()
        .map(|e| EndpointRow { id: e.id.0, url: e.url.clone(), status: e.status.as_str(), tunnel_count: e.tunnel_count })
        .collect();

    if rows.is_empty() {
        println!("no endpoints configured");
    } else {
        println!("{}", Table::new(rows));
    }

    Ok(())
}

async fn migrate(config_path: &std::path::Path) -> nodepassdash_core::Result<()> {
    let config = Config::load(config_path)?;
    db::create_pool(&config.database.url, 1)?;
    println!("migrations applied");
    Ok(())
}

/// Insert each `[[endpoints]]` entry from the config file directly,
/// skipping ids already present.
async fn seed(config_path: &std::path::Path) -> nodepassdash_core::Result<()> {
    let config = Config::load(config_path)?;
    let pool = db::create_pool(&config.database.url, 1)?;
    let mut conn = pool.get().map_err(|e| nodepassdash_core::Error::Connection(e.to_string()))?;

    let now = chrono::Utc::now().to_rfc3339();
    let mut inserted = 0;
    for entry in &config.endpoints {
        let row = NewEndpointRow {
            id: entry.id,
            url: entry.url.clone(),
            api_path: entry.api_path.clone(),
            api_key: entry.api_key.clone(),
            status: "OFFLINE".to_string(),
            tunnel_count: 0,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let rows = diesel::insert_into(endpoints::table)
            .values(&row)
            .on_conflict(endpoints::id)
            .do_nothing()
            .execute(&mut conn)
            .map_err(|e| nodepassdash_core::Error::Database(e.to_string()))?;
        inserted += rows;
    }

    println!("seeded {inserted} endpoint(s) ({} already present)", config.endpoints.len() - inserted);
    Ok(())
}
