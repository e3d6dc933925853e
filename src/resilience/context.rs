//! Call context: cancellation and deadlines.
//!
//! # Responsibilities
//! - Carry the caller's cancellation token and optional deadline into every
//!   suspension point (bulkhead wait, retry sleep, network I/O)
//! - Report why a context is done (`Cancelled` vs `DeadlineExceeded`)
//!
//! # Design Decisions
//! - Uses `tokio_util::sync::CancellationToken`; child contexts cancel with
//!   their parent but never the other way round
//! - Deadlines use `tokio::time::Instant` so paused-clock tests can drive them

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a [`CallContext`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The token was cancelled.
    #[error("context cancelled")]
    Cancelled,
    /// The deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation and deadline scope for one logical request.
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A fresh root context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Derive a context that expires after `timeout`, or earlier if the
    /// current deadline is sooner.
    pub fn timeout(&self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Derive a context with the given deadline (the earliest deadline wins).
    pub fn deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child that can be cancelled without affecting `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, or `None` while it is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline elapses.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Run `fut` unless the context finishes first.
    pub async fn run<F: std::future::Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = CallContext::background();
        assert_eq!(ctx.err(), None);
        assert!(ctx.deadline_at().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_children_only() {
        let parent = CallContext::background();
        let child = parent.child();
        child.cancel();
        assert_eq!(child.err(), Some(ContextError::Cancelled));
        assert_eq!(parent.err(), None);

        let child = parent.child();
        parent.cancel();
        assert_eq!(child.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let ctx = CallContext::with_timeout(Duration::from_secs(1));
        let derived = ctx.timeout(Duration::from_secs(60));
        assert_eq!(derived.deadline_at(), ctx.deadline_at());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_on_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let res = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(res, Err(ContextError::DeadlineExceeded));
    }
}
