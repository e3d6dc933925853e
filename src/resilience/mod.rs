//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call (client.rs):
//!     → bulkhead.rs (wait for a slot, bounded by the call context)
//!     → circuit_breaker.rs (fail fast while open, count outcomes)
//!     → retries.rs (retry each failed attempt with backoff.rs delays)
//!     → single network attempt, bounded by context.rs
//! ```
//!
//! # Design Decisions
//! - One breaker, bulkhead and retry config per dependency, built at startup
//!   and shared by reference for the process lifetime
//! - Every suspension point observes the caller's cancellation and deadline
//! - Each layer returns `Result`; errors are never swallowed, only classified
//! - State is process-local; instances never coordinate

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod client;
pub mod context;
pub mod retries;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use circuit_breaker::{BreakerSettings, CircuitBreaker, CircuitCounts, CircuitOpenError, CircuitState};
pub use client::ResilientClient;
pub use context::{CallContext, ContextError};
pub use retries::{retry_with_backoff, RetryConfig};
