//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bfa_request_duration_seconds` (histogram): latency by operation
//! - `bfa_requests_total` (counter): requests by outcome status
//! - `bfa_external_errors_total` (counter): terminal upstream failures by service
//! - `bfa_upstream_attempts_total` (counter): network attempts by service
//! - `bfa_cache_hits_total` / `bfa_cache_misses_total` (counter): by cache
//! - `bfa_llm_tokens_total` (counter): prompt/completion tokens
//! - `bfa_circuit_state` (gauge): 0 closed, 1 half-open, 2 open

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_duration(operation: &'static str, elapsed: Duration) {
    histogram!("bfa_request_duration_seconds", "operation" => operation).record(elapsed.as_secs_f64());
}

pub fn record_request(status: &'static str) {
    counter!("bfa_requests_total", "status" => status).increment(1);
}

pub fn record_external_error(service: &str) {
    counter!("bfa_external_errors_total", "service" => service.to_string()).increment(1);
}

pub fn record_upstream_attempt(service: &str) {
    counter!("bfa_upstream_attempts_total", "service" => service.to_string()).increment(1);
}

pub fn record_cache_hit(cache: &'static str) {
    counter!("bfa_cache_hits_total", "cache" => cache).increment(1);
}

pub fn record_cache_miss(cache: &'static str) {
    counter!("bfa_cache_misses_total", "cache" => cache).increment(1);
}

pub fn record_tokens(prompt: u64, completion: u64) {
    counter!("bfa_llm_tokens_total", "type" => "prompt").increment(prompt);
    counter!("bfa_llm_tokens_total", "type" => "completion").increment(completion);
}

pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    gauge!("bfa_circuit_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}
