//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Durations are stored as integer seconds or milliseconds, matching the
//! environment variables that override them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::RetryConfig;

/// Root configuration for the backend-for-agent service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BfaConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Base URLs of the profile, transactions and agent services.
    pub upstreams: UpstreamsConfig,

    /// Optional PostgREST data backend replacing the profile and
    /// transactions APIs.
    pub data_backend: DataBackendConfig,

    /// Retry and bulkhead parameters applied to every dependency.
    pub resilience: ResilienceConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Deadline for a whole inbound request, upstream calls included.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    pub profile_url: String,
    pub transactions_url: String,
    pub agent_url: String,

    /// Timeout applied by the HTTP client to each single attempt.
    pub http_timeout_ms: u64,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            profile_url: "http://localhost:8081".to_string(),
            transactions_url: "http://localhost:8082".to_string(),
            agent_url: "http://localhost:8090".to_string(),
            http_timeout_ms: 10_000,
        }
    }
}

impl UpstreamsConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataBackendConfig {
    /// Read profiles and transactions from the data backend instead of the
    /// upstream APIs. Has no effect until `url` is set.
    pub enabled: bool,
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
}

impl Default for DataBackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
        }
    }
}

impl DataBackendConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.url.is_empty()
    }

    /// Key sent as bearer token; the service role key when present.
    pub fn bearer_key(&self) -> &str {
        if self.service_role_key.is_empty() {
            &self.anon_key
        } else {
            &self.service_role_key
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_backoff_ms: u64,

    /// Bulkhead capacity per dependency.
    pub max_concurrency: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_retries: retry.max_retries,
            initial_backoff_ms: u64::try_from(retry.initial_backoff.as_millis()).unwrap_or(u64::MAX),
            max_concurrency: retry.max_concurrency,
        }
    }
}

impl ResilienceConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Profile cache entry lifetime.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
