//! Retry logic.
//!
//! # Responsibilities
//! - Drive up to `max_retries + 1` attempts of one operation
//! - Sleep between attempts using exponential backoff + jitter
//! - Stop as soon as the caller's context is cancelled or expires
//!
//! # Design Decisions
//! - Every failure is retried, terminal or not; classification happens in
//!   the caller once the budget is spent
//! - The last error is returned as-is so callers can still match on it
//! - The context is checked before every attempt, including the first

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;
use crate::resilience::context::{CallContext, ContextError};

/// Retry parameters for one upstream dependency. Immutable after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff: Duration,
    /// Bulkhead capacity for the dependency.
    pub max_concurrency: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_concurrency: 50,
        }
    }
}

/// Execute `op` with exponential backoff + jitter, honouring `ctx`.
///
/// Returns the first success, the context error if `ctx` finishes before or
/// between attempts, or the error of the final attempt once
/// `max_retries` retries have failed.
pub async fn retry_with_backoff<T, E, F, Fut>(
    ctx: &CallContext,
    cfg: &RetryConfig,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<ContextError> + Display,
{
    let mut attempt: u32 = 0;
    loop {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= cfg.max_retries {
            tracing::warn!(attempts = attempt + 1, error = %err, "Retry budget exhausted");
            return Err(err);
        }

        let delay = calculate_backoff(attempt, cfg.initial_backoff);
        tracing::debug!(attempt = attempt + 1, delay = ?delay, error = %err, "Attempt failed, backing off");

        tokio::select! {
            biased;
            cause = ctx.done() => return Err(cause.into()),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
