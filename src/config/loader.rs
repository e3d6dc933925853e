//! Configuration loading from disk and the environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::BfaConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An environment variable that was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredOverride {
    pub variable: &'static str,
    pub value: String,
}

/// A validated config plus the overrides that were skipped on the way.
///
/// Loading runs before logging is installed, so callers log
/// `ignored_overrides` once the subscriber is up.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BfaConfig,
    pub ignored_overrides: Vec<IgnoredOverride>,
}

impl LoadedConfig {
    pub fn log_ignored_overrides(&self) {
        for ignored in &self.ignored_overrides {
            tracing::warn!(
                variable = ignored.variable,
                value = %ignored.value,
                "Ignoring unparsable environment override"
            );
        }
    }
}

/// Load and validate configuration from a TOML file.
///
/// Environment variables are applied on top of the file before validation.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BfaConfig = toml::from_str(&content)?;
    finish(config)
}

/// Load from `path` when given, otherwise start from defaults.
pub fn load(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => finish(BfaConfig::default()),
    }
}

fn finish(mut config: BfaConfig) -> Result<LoadedConfig, ConfigError> {
    let ignored_overrides = apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(LoadedConfig {
        config,
        ignored_overrides,
    })
}

/// Apply the process environment to `config`.
pub fn apply_env_overrides(config: &mut BfaConfig) -> Vec<IgnoredOverride> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`.
///
/// Unparsable values leave the field untouched and are returned.
pub fn apply_overrides<F>(config: &mut BfaConfig, lookup: F) -> Vec<IgnoredOverride>
where
    F: Fn(&str) -> Option<String>,
{
    let mut ignored = Vec::new();
    if let Some(port) = parse_var::<u16, _>(&lookup, "PORT", &mut ignored) {
        config.server.bind_address = match config.server.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                addr.set_port(port);
                addr.to_string()
            }
            Err(_) => format!("0.0.0.0:{port}"),
        };
    }
    if let Some(ms) = parse_var(&lookup, "HTTP_TIMEOUT_MS", &mut ignored) {
        config.upstreams.http_timeout_ms = ms;
    }
    if let Some(n) = parse_var(&lookup, "MAX_RETRIES", &mut ignored) {
        config.resilience.max_retries = n;
    }
    if let Some(ms) = parse_var(&lookup, "INITIAL_BACKOFF_MS", &mut ignored) {
        config.resilience.initial_backoff_ms = ms;
    }
    if let Some(n) = parse_var(&lookup, "MAX_CONCURRENCY", &mut ignored) {
        config.resilience.max_concurrency = n;
    }
    if let Some(secs) = parse_var(&lookup, "CACHE_TTL_SECS", &mut ignored) {
        config.cache.ttl_secs = secs;
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(url) = lookup("PROFILE_API_URL") {
        config.upstreams.profile_url = url;
    }
    if let Some(url) = lookup("TRANSACTIONS_API_URL") {
        config.upstreams.transactions_url = url;
    }
    if let Some(url) = lookup("AGENT_API_URL") {
        config.upstreams.agent_url = url;
    }
    if let Some(url) = lookup("SUPABASE_URL") {
        config.data_backend.url = url;
    }
    if let Some(key) = lookup("SUPABASE_ANON_KEY") {
        config.data_backend.anon_key = key;
    }
    if let Some(key) = lookup("SUPABASE_SERVICE_ROLE_KEY") {
        config.data_backend.service_role_key = key;
    }
    // Only the exact string "true" keeps the backend enabled.
    if let Some(flag) = lookup("USE_SUPABASE") {
        config.data_backend.enabled = flag == "true";
    }

    ignored
}

fn parse_var<T, F>(lookup: &F, key: &'static str, ignored: &mut Vec<IgnoredOverride>) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            ignored.push(IgnoredOverride {
                variable: key,
                value: raw,
            });
            None
        }
    }
}
