//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout (JSON in production, pretty in debug)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every HTTP span
//! - Metrics are cheap and become no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
