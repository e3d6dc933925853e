//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: a bounded number of trial requests probe for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: requests >= min_requests && failure ratio >= threshold
//! Closed → Closed: counters reset every `interval`
//! Open → Half-Open: after `timeout`
//! Half-Open → Closed: `max_requests` consecutive trial successes
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global), process-local state
//! - Every state change starts a new generation; late outcomes from an older
//!   generation are discarded
//! - Rejected requests are not counted, so a stream of fast failures while
//!   Open cannot skew the next window
//! - A dispatched call that is dropped before finishing counts as a failure

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::HalfOpen => write!(f, "half-open"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Rolling counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitCounts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl CircuitCounts {
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        f64::from(self.total_failures) / f64::from(self.requests)
    }

    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}

/// Breaker tuning. Defaults match every upstream dependency of the service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSettings {
    /// Trial requests allowed while half-open.
    pub max_requests: u32,
    /// Counter reset period while closed. Zero disables resets.
    pub interval: Duration,
    /// Time spent open before probing.
    pub timeout: Duration,
    /// Minimum requests in a window before the ratio is considered.
    pub min_requests: u32,
    /// Failure ratio that trips the breaker.
    pub failure_ratio: f64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            max_requests: 3,
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            min_requests: 5,
            failure_ratio: 0.6,
        }
    }
}

/// The breaker refused to dispatch a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{breaker}' is {state}")]
pub struct CircuitOpenError {
    pub breaker: String,
    /// `Open`, or `HalfOpen` when all trial slots are taken.
    pub state: CircuitState,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    counts: CircuitCounts,
    expiry: Option<Instant>,
}

/// Closed/open/half-open gate around calls to one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker with the default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, BreakerSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let name = name.into();
        let expiry = (!settings.interval.is_zero()).then(|| Instant::now() + settings.interval);
        metrics::record_circuit_state(&name, CircuitState::Closed);
        Self {
            name,
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                counts: CircuitCounts::default(),
                expiry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, applying any due time-based transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now()).0
    }

    /// Counters of the current generation.
    pub fn counts(&self) -> CircuitCounts {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now());
        inner.counts
    }

    /// Run `op` once if the breaker admits it.
    ///
    /// The outcome of `op` is returned unchanged; `CircuitOpenError` is only
    /// produced when the call is refused.
    pub async fn execute<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let generation = self.before_request()?;
        let outcome = Outcome {
            breaker: self,
            generation,
            reported: false,
        };

        let result = op().await;
        outcome.report(result.is_ok());
        result
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn before_request(&self) -> Result<u64, CircuitOpenError> {
        let mut inner = self.lock();
        let (state, generation) = self.current_state(&mut inner, Instant::now());

        let refused = match state {
            CircuitState::Open => true,
            CircuitState::HalfOpen => inner.counts.requests >= self.settings.max_requests,
            CircuitState::Closed => false,
        };
        if refused {
            tracing::debug!(breaker = %self.name, state = %state, "Circuit breaker refused call");
            return Err(CircuitOpenError {
                breaker: self.name.clone(),
                state,
            });
        }

        inner.counts.on_request();
        Ok(generation)
    }

    fn after_request(&self, generation: u64, success: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        let (state, current) = self.current_state(&mut inner, now);
        if generation != current {
            return;
        }

        if success {
            inner.counts.on_success();
            if state == CircuitState::HalfOpen
                && inner.counts.consecutive_successes >= self.settings.max_requests
            {
                self.set_state(&mut inner, CircuitState::Closed, now);
            }
        } else {
            match state {
                CircuitState::Closed => {
                    inner.counts.on_failure();
                    if self.ready_to_trip(&inner.counts) {
                        self.set_state(&mut inner, CircuitState::Open, now);
                    }
                }
                CircuitState::HalfOpen => self.set_state(&mut inner, CircuitState::Open, now),
                CircuitState::Open => {}
            }
        }
    }

    fn ready_to_trip(&self, counts: &CircuitCounts) -> bool {
        counts.requests >= self.settings.min_requests
            && counts.failure_ratio() >= self.settings.failure_ratio
    }

    fn current_state(&self, inner: &mut Inner, now: Instant) -> (CircuitState, u64) {
        match inner.state {
            CircuitState::Closed => {
                if inner.expiry.is_some_and(|expiry| now >= expiry) {
                    self.new_generation(inner, now);
                }
            }
            CircuitState::Open => {
                if inner.expiry.is_some_and(|expiry| now >= expiry) {
                    self.set_state(inner, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
        (inner.state, inner.generation)
    }

    fn set_state(&self, inner: &mut Inner, state: CircuitState, now: Instant) {
        if inner.state == state {
            return;
        }
        let from = inner.state;
        inner.state = state;
        self.new_generation(inner, now);

        tracing::info!(
            breaker = %self.name,
            from = %from,
            to = %state,
            "Circuit breaker state changed"
        );
        metrics::record_circuit_state(&self.name, state);
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counts = CircuitCounts::default();
        inner.expiry = match inner.state {
            CircuitState::Closed => {
                (!self.settings.interval.is_zero()).then(|| now + self.settings.interval)
            }
            CircuitState::Open => Some(now + self.settings.timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

/// Reports a failure for the dispatched call unless an outcome was recorded.
struct Outcome<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    reported: bool,
}

impl Outcome<'_> {
    fn report(mut self, success: bool) {
        self.reported = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for Outcome<'_> {
    fn drop(&mut self) {
        if !self.reported {
            self.breaker.after_request(self.generation, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Eq, Error)]
    enum TestError {
        #[error("boom")]
        Boom,
        #[error(transparent)]
        Open(#[from] CircuitOpenError),
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), TestError> {
        cb.execute(|| async { Err(TestError::Boom) }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), TestError> {
        cb.execute(|| async { Ok(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_five_failures() {
        let cb = CircuitBreaker::new("profile");
        for _ in 0..5 {
            assert_eq!(fail(&cb).await, Err(TestError::Boom));
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let res: Result<(), TestError> = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(
            res,
            Err(TestError::Open(CircuitOpenError {
                breaker: "profile".into(),
                state: CircuitState::Open,
            }))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0, "refused call must not run");
        assert_eq!(cb.counts().requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_needs_minimum_requests() {
        let cb = CircuitBreaker::new("profile");
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.counts().total_failures, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_ratio_threshold() {
        let cb = CircuitBreaker::new("transactions");
        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open, "3/5 = 0.6 trips");

        let cb = CircuitBreaker::new("transactions");
        for _ in 0..3 {
            succeed(&cb).await.unwrap();
        }
        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed, "2/5 = 0.4 stays closed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_recovers_after_successes() {
        let cb = CircuitBreaker::new("agent");
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cb.state(), CircuitState::Open);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.counts(), CircuitCounts::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("agent");
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;

        succeed(&cb).await.unwrap();
        assert_eq!(fail(&cb).await, Err(TestError::Boom));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(matches!(succeed(&cb).await, Err(TestError::Open(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_reset_each_interval() {
        let cb = CircuitBreaker::new("data-backend");
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cb.counts(), CircuitCounts::default());

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_limits_trials() {
        let cb = Arc::new(CircuitBreaker::new("agent"));
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let mut trials = Vec::new();
        for _ in 0..3 {
            let cb = cb.clone();
            let gate = gate.clone();
            trials.push(tokio::spawn(async move {
                cb.execute(|| async move {
                    let _permit = gate.acquire().await.map_err(|_| TestError::Boom)?;
                    Ok::<_, TestError>(())
                })
                .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(1)).await;

        let refused = succeed(&cb).await;
        assert_eq!(
            refused,
            Err(TestError::Open(CircuitOpenError {
                breaker: "agent".into(),
                state: CircuitState::HalfOpen,
            }))
        );

        gate.add_permits(3);
        for trial in trials {
            trial.await.unwrap().unwrap();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_counts_as_failure() {
        let cb = CircuitBreaker::new("agent");
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            cb.execute(|| std::future::pending::<Result<(), TestError>>()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_outcomes_are_counted_exactly() {
        let settings = BreakerSettings {
            min_requests: u32::MAX,
            ..BreakerSettings::default()
        };
        let cb = Arc::new(CircuitBreaker::with_settings("profile", settings));

        let tasks: Vec<_> = (0..200u32)
            .map(|i| {
                let cb = cb.clone();
                tokio::spawn(async move {
                    cb.execute(|| async move {
                        tokio::task::yield_now().await;
                        if i % 4 == 0 {
                            Err(TestError::Boom)
                        } else {
                            Ok(())
                        }
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            let _ = task.await.unwrap();
        }

        let counts = cb.counts();
        assert_eq!(counts.requests, 200);
        assert_eq!(counts.total_failures, 50);
        assert_eq!(counts.total_successes, 150);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_trip_once() {
        let cb = Arc::new(CircuitBreaker::new("agent"));
        let ran = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let cb = cb.clone();
                let ran = ran.clone();
                tokio::spawn(async move {
                    cb.execute(|| async move {
                        ran.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Err::<(), _>(TestError::Boom)
                    })
                    .await
                })
            })
            .collect();

        let mut failed = 0;
        let mut refused = 0;
        for task in tasks {
            match task.await.unwrap() {
                Err(TestError::Boom) => failed += 1,
                Err(TestError::Open(_)) => refused += 1,
                Ok(()) => panic!("no call succeeds"),
            }
        }

        assert_eq!(failed + refused, 100);
        assert!(failed >= 5, "the breaker needs five failures to trip");
        assert_eq!(ran.load(Ordering::SeqCst), failed, "refused calls never run");
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.counts(), CircuitCounts::default(), "the open generation starts empty");
    }
}
