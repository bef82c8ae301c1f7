//! Application configuration loading, defaults, and logging bootstrap.

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub raw_capacity: usize,
    pub store_capacity: usize,
    pub batch_insert_capacity: usize,
    pub history_capacity: usize,
    pub optimized_store_threshold: usize,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            raw_capacity: 30_000,
            store_capacity: 20_000,
            batch_insert_capacity: 5_000,
            history_capacity: 15_000,
            optimized_store_threshold: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub dispatcher_workers: usize,
    pub store_workers: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { dispatcher_workers: 12, store_workers: 8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimersConfig {
    pub reconnect_interval_secs: u64,
    pub health_interval_secs: u64,
    pub first_event_timeout_secs: u64,
    pub min_reconnect_gap_secs: u64,
    pub batch_flush_interval_ms: u64,
    pub optimized_flush_interval_secs: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_secs: 60,
            health_interval_secs: 30,
            first_event_timeout_secs: 10,
            min_reconnect_gap_secs: 30,
            batch_flush_interval_ms: 150,
            optimized_flush_interval_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub window_size: usize,
    pub data_interval_secs: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { window_size: 12, data_interval_secs: 5.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Bootstrap-only endpoint seed, consumed by the `seed` CLI subcommand and
/// integration tests. Production endpoints are rows already present in the
/// database, created by the external management API.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSeed {
    pub id: i64,
    pub url: String,
    pub api_path: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queues: QueuesConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub timers: TimersConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointSeed>,
}

/// Section names eligible for `NODEPASSDASH_<SECTION>_<KEY>` overrides.
/// `endpoints` is a bootstrap list, not a key/value section, so it is not
/// covered here.
const OVERRIDABLE_SECTIONS: &[&str] =
    &["database", "queues", "workers", "timers", "history", "logging"];

/// Parse one `NODEPASSDASH_*` value into the TOML type its field expects,
/// falling back to a plain string.
fn parse_env_scalar(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}

/// Patch `table` in place from every `NODEPASSDASH_<SECTION>_<KEY>`
/// environment variable whose `<SECTION>` matches [`OVERRIDABLE_SECTIONS`].
fn apply_env_overrides(table: &mut toml::value::Table) {
    for (name, value) in std::env::vars() {
        let Some(rest) = name.strip_prefix("NODEPASSDASH_") else { continue };

        for section in OVERRIDABLE_SECTIONS {
            let prefix = format!("{}_", section.to_uppercase());
            let Some(field) = rest.strip_prefix(&prefix) else { continue };
            if field.is_empty() {
                continue;
            }

            let field = field.to_lowercase();
            let section_table = table
                .entry(section.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
            if let toml::Value::Table(section_table) = section_table {
                section_table.insert(field, parse_env_scalar(&value));
            }
            break;
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply `NODEPASSDASH_*`
    /// environment overrides on top: any `NODEPASSDASH_<SECTION>_<KEY>`
    /// overrides the matching TOML key for that section.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;

        let mut value: toml::Value =
            toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config: {e}")))?;

        if let toml::Value::Table(table) = &mut value {
            apply_env_overrides(table);
        }

        let patched = toml::to_string(&value)
            .map_err(|e| Error::Config(format!("invalid config after env overrides: {e}")))?;
        let config: Config =
            toml::from_str(&patched).map_err(|e| Error::Config(format!("invalid config: {e}")))?;

        Ok(config)
    }

    /// Initialize the global `tracing` subscriber. `RUST_LOG` always wins
    /// over `[logging].level` when set.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        if self.logging.json {
            fmt().json().with_env_filter(filter).init();
        } else {
            fmt().with_env_filter(filter).init();
        }
    }
}
