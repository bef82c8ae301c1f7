//! Collaborator interface for the file-backed log writer, which lives
//! outside this crate's own scope. C4's `log` handler forwards non-empty
//! log payloads here, keyed by the tunnel that produced them.

use async_trait::async_trait;

use crate::domain::TunnelKey;
use crate::error::Result;

#[async_trait]
pub trait FileLogSink: Send + Sync {
    async fn append(&self, key: &TunnelKey, logs: &str) -> Result<()>;
}

/// Discards everything. Used when no file-log collaborator is wired in.
pub struct NullLogSink;

#[async_trait]
impl FileLogSink for NullLogSink {
    async fn append(&self, _key: &TunnelKey, _logs: &str) -> Result<()> {
        Ok(())
    }
}
