//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and value ranges (non-zero and below the caps below)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BfaConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::Semaphore;

use crate::config::schema::BfaConfig;

/// One hour.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3_600;
/// One hour.
pub const MAX_HTTP_TIMEOUT_MS: u64 = 3_600_000;
/// One minute.
pub const MAX_INITIAL_BACKOFF_MS: u64 = 60_000;
/// One day.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &BfaConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("invalid socket address '{}'", config.server.bind_address),
        ));
    }
    check_range(
        &mut errors,
        "server.request_timeout_secs",
        config.server.request_timeout_secs,
        MAX_REQUEST_TIMEOUT_SECS,
    );

    let upstreams = &config.upstreams;
    for (field, value) in [
        ("upstreams.profile_url", &upstreams.profile_url),
        ("upstreams.transactions_url", &upstreams.transactions_url),
        ("upstreams.agent_url", &upstreams.agent_url),
    ] {
        check_url(&mut errors, field, value);
    }
    check_range(&mut errors, "upstreams.http_timeout_ms", upstreams.http_timeout_ms, MAX_HTTP_TIMEOUT_MS);

    if config.data_backend.is_active() {
        check_url(&mut errors, "data_backend.url", &config.data_backend.url);
        if config.data_backend.bearer_key().is_empty() {
            errors.push(ValidationError::new(
                "data_backend.anon_key",
                "an anon or service role key is required when the data backend is enabled",
            ));
        }
    }

    // Bounded by what a tokio semaphore can hold.
    check_range(
        &mut errors,
        "resilience.max_concurrency",
        u64::try_from(config.resilience.max_concurrency).unwrap_or(u64::MAX),
        u64::try_from(Semaphore::MAX_PERMITS).unwrap_or(u64::MAX),
    );
    check_range(
        &mut errors,
        "resilience.initial_backoff_ms",
        config.resilience.initial_backoff_ms,
        MAX_INITIAL_BACKOFF_MS,
    );
    check_range(&mut errors, "cache.ttl_secs", config.cache.ttl_secs, MAX_CACHE_TTL_SECS);

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_range(errors: &mut Vec<ValidationError>, field: &'static str, value: u64, max: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0"));
    } else if value > max {
        errors.push(ValidationError::new(field, format!("must be at most {max}, got {value}")));
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", parsed.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{value}': {e}"))),
    }
}
