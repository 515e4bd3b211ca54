//! Process configuration from command-line flags and environment variables.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::network::NetworkConfig;
use crate::opstorage::StorageConfig;
use crate::service::CacheConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// opstore proxy: tenant-aware datasource lookups against the storage service.
#[derive(Debug, Clone, Parser)]
#[command(name = "opstore-proxy", version, about, long_about = None)]
pub struct ProxyConfig {
    /// Base URL of the storage service
    #[arg(long, env = "OPSTORAGE_BASEURL")]
    pub storage_base_url: String,

    /// API key sent as `X-API-Key` to the storage service
    #[arg(long, env = "OPSTORAGE_APIKEY", default_value = "", hide_env_values = true)]
    pub storage_api_key: String,

    /// Ingress bind address
    #[arg(long, env = "OPSTORE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Ingress port
    #[arg(long, env = "OPSTORE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Ingress request timeout in milliseconds
    #[arg(long, env = "OPSTORE_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Storage request timeout in milliseconds (0 disables)
    #[arg(long, env = "OPSTORE_BACKEND_TIMEOUT_MS", default_value_t = 10_000)]
    pub backend_timeout_ms: u64,

    /// Lifetime of datasource entries in the queried keyspace, in milliseconds
    #[arg(long, env = "OPSTORE_DS_CACHE_TTL_MS", default_value_t = 5_000)]
    pub datasource_ttl_ms: u64,

    /// Lifetime of uid entries seeded by id lookups, in milliseconds
    #[arg(long, env = "OPSTORE_DS_UID_CACHE_TTL_MS", default_value_t = 5_000)]
    pub datasource_uid_ttl_ms: u64,

    /// Interval between expired-entry sweeps, in milliseconds (0 disables)
    #[arg(long, env = "OPSTORE_CACHE_SWEEP_MS", default_value_t = 30_000)]
    pub cache_sweep_ms: u64,

    /// Log output format
    #[arg(long, env = "OPSTORE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Port for the Prometheus scrape endpoint (disabled when unset)
    #[arg(long, env = "OPSTORE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl ProxyConfig {
    #[must_use]
    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    #[must_use]
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            base_url: self.storage_base_url.clone(),
            api_key: self.storage_api_key.clone(),
            request_timeout: (self.backend_timeout_ms > 0)
                .then(|| Duration::from_millis(self.backend_timeout_ms)),
            user_agent: Some(concat!("opstore-proxy/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }

    #[must_use]
    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            primary_ttl: Duration::from_millis(self.datasource_ttl_ms),
            secondary_ttl: Duration::from_millis(self.datasource_uid_ttl_ms),
        }
    }

    /// Sweep interval, or `None` when sweeping is disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.cache_sweep_ms > 0).then(|| Duration::from_millis(self.cache_sweep_ms))
    }
}
