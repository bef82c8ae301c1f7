//! SSE ingestion and event-processing core for NodePassDash tunnel
//! telemetry. Components C1-C7 (connection through broadcaster) implement
//! the ingestion pipeline end to end.

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod db;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod filelog;
pub mod history;
pub mod notify;
pub mod persistence;
pub mod processor;
pub mod remote;
pub mod status;
pub mod store;

pub use error::{Error, Result};

/// Every tunnel/endpoint row here implements `Send + Sync` and is cheap to
/// clone (`Arc`), so an embedding application can share one instance across
/// its own HTTP layer and this crate's background tasks.
pub use store::sqlite::SqliteStore;
