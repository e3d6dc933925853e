//! Resilient client: the pipeline every upstream call goes through.
//!
//! ```text
//! Bulkhead.acquire → CircuitBreaker.execute(retry_with_backoff(attempt)) → release
//! ```
//!
//! The client owns no state; breaker, bulkhead and retry config are injected
//! once per dependency at startup and shared for the life of the process.

use std::future::Future;
use std::sync::Arc;

use crate::error::{AttemptError, ServiceError, ServiceResult};
use crate::observability::metrics;
use crate::resilience::bulkhead::Bulkhead;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::context::CallContext;
use crate::resilience::retries::{retry_with_backoff, RetryConfig};

/// Fault-tolerance wrapper for one upstream dependency.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    name: String,
    breaker: Arc<CircuitBreaker>,
    bulkhead: Arc<Bulkhead>,
    retry: RetryConfig,
}

impl ResilientClient {
    pub fn new(
        name: impl Into<String>,
        breaker: Arc<CircuitBreaker>,
        bulkhead: Arc<Bulkhead>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            name: name.into(),
            breaker,
            bulkhead,
            retry,
        }
    }

    /// Build a client with its own breaker and bulkhead sized from `retry`.
    pub fn for_dependency(name: impl Into<String>, retry: RetryConfig) -> Self {
        let name = name.into();
        let breaker = Arc::new(CircuitBreaker::new(name.clone()));
        let bulkhead = Arc::new(Bulkhead::new(retry.max_concurrency));
        Self::new(name, breaker, bulkhead, retry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Run `attempt` through bulkhead, breaker and retrier.
    ///
    /// Each attempt is bounded by `ctx`; the final failure is classified
    /// into a [`ServiceError`] tagged with this dependency's name.
    pub async fn call<T, F, Fut>(&self, ctx: &CallContext, mut attempt: F) -> ServiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let _permit = self
            .bulkhead
            .acquire(ctx)
            .await
            .map_err(|cause| ServiceError::from_context(&self.name, cause))?;

        let attempt = &mut attempt;
        let result = self
            .breaker
            .execute(move || {
                retry_with_backoff(ctx, &self.retry, move || {
                    metrics::record_upstream_attempt(&self.name);
                    let fut = attempt();
                    async move {
                        match ctx.run(fut).await {
                            Ok(outcome) => outcome,
                            Err(cause) => Err(AttemptError::from(cause)),
                        }
                    }
                })
            })
            .await;

        result.map_err(|err| {
            if !matches!(err, AttemptError::CircuitOpen(_)) {
                tracing::error!(
                    service = %self.name,
                    transient = err.is_transient(),
                    error = %err,
                    "Upstream call failed"
                );
            }
            metrics::record_external_error(&self.name);
            ServiceError::from_attempt(&self.name, err)
        })
    }
}
