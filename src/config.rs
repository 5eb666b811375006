//! Configuration for TierKV

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: String,

    /// Maximum number of concurrent sessions
    pub max_connections: usize,

    /// Read buffer size per connection (bytes)
    pub read_buffer_size: usize,

    /// Write buffer size per connection (bytes)
    pub write_buffer_size: usize,

    /// Longest command line accepted before the session is dropped (bytes)
    pub max_line_length: usize,

    /// Number of Tokio worker threads (0 = number of CPUs)
    pub worker_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 10000,
            read_buffer_size: 8192,
            write_buffer_size: 8192,
            max_line_length: 64 * 1024,
            worker_threads: 0,
        }
    }
}

/// Which store acts as the source of truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityKind {
    /// RocksDB authority fronted by an in-memory cache
    Rocksdb,
    /// A single in-memory store, no layering
    Memory,
}

impl AuthorityKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "rocksdb" => Some(Self::Rocksdb),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub authority: AuthorityKind,

    /// Path to RocksDB data directory
    pub db_path: PathBuf,

    /// Table holding the key/value records (a RocksDB column family)
    pub table: String,

    /// Upper bound for a single authority call in milliseconds
    pub request_timeout_ms: u64,

    /// Block cache size in bytes
    pub block_cache_size: usize,

    /// Write buffer size in bytes
    pub write_buffer_size: usize,

    /// Maximum number of background jobs
    pub max_background_jobs: i32,

    /// Enable compression
    pub enable_compression: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            authority: AuthorityKind::Rocksdb,
            db_path: PathBuf::from("./data/rocksdb"),
            table: "tierkv".to_string(),
            request_timeout_ms: 1000,
            block_cache_size: 64 * 1024 * 1024, // 64MB
            write_buffer_size: 64 * 1024 * 1024,
            max_background_jobs: 4,
            enable_compression: false,
        }
    }
}

impl StorageConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Metrics and health check configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics/health HTTP endpoint
    pub enabled: bool,

    /// Address for metrics/health HTTP server
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:9090".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::TierKvError::Config(format!("Failed to read config file: {e}"))
        })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| crate::TierKvError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("TIERKV_LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| crate::TierKvError::Config(format!("Invalid PORT: {port}")))?;
            config.server.listen_addr = with_port(&config.server.listen_addr, port);
        }

        if let Some(max_conn) = lookup("TIERKV_MAX_CONNECTIONS")
            && let Ok(n) = max_conn.parse()
        {
            config.server.max_connections = n;
        }

        if let Some(authority) = lookup("TIERKV_AUTHORITY") {
            config.storage.authority = AuthorityKind::parse(&authority).ok_or_else(|| {
                crate::TierKvError::Config(format!("Unknown authority: {authority}"))
            })?;
        }

        if let Some(path) = lookup("TIERKV_DB_PATH") {
            config.storage.db_path = PathBuf::from(path);
        }

        if let Some(table) = lookup("TIERKV_TABLE") {
            config.storage.table = table;
        }

        if let Some(timeout) = lookup("TIERKV_REQUEST_TIMEOUT_MS")
            && let Ok(ms) = timeout.parse()
        {
            config.storage.request_timeout_ms = ms;
        }

        if let Some(addr) = lookup("TIERKV_METRICS_ADDR") {
            config.metrics.listen_addr = addr;
        }

        if let Some(enabled) = lookup("TIERKV_METRICS_ENABLED") {
            config.metrics.enabled = enabled.to_lowercase() == "true" || enabled == "1";
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage.authority == AuthorityKind::Rocksdb && self.storage.table.is_empty() {
            return Err(crate::TierKvError::Config(
                "storage.table is required for the rocksdb authority".to_string(),
            ));
        }
        if self.storage.request_timeout_ms == 0 {
            return Err(crate::TierKvError::Config(
                "storage.request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.server.max_connections == 0 || self.server.max_line_length == 0 {
            return Err(crate::TierKvError::Config(
                "server limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replace the port of a `host:port` address
fn with_port(addr: &str, port: u16) -> String {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:6379");
        assert_eq!(config.storage.authority, AuthorityKind::Rocksdb);
        assert_eq!(config.storage.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "7000"),
            ("TIERKV_TABLE", "sessions"),
            ("TIERKV_AUTHORITY", "memory"),
            ("TIERKV_METRICS_ENABLED", "0"),
        ]))
        .unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:7000");
        assert_eq!(config.storage.table, "sessions");
        assert_eq!(config.storage.authority, AuthorityKind::Memory);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_invalid_env() {
        assert!(Config::from_lookup(lookup_from(&[("PORT", "bacon")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TIERKV_AUTHORITY", "dynamo")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TIERKV_TABLE", "")])).is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            listen_addr = "0.0.0.0:6400"

            [storage]
            authority = "rocksdb"
            table = "kv"
            request_timeout_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:6400");
        assert_eq!(config.storage.table, "kv");
        assert_eq!(config.storage.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.server.max_connections, 10000);
    }

    #[test]
    fn test_memory_authority_needs_no_table() {
        let config = Config::from_toml(
            r#"
            [storage]
            authority = "memory"
            table = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.authority, AuthorityKind::Memory);
    }
}
