//! In-memory caching.
//!
//! # Data Flow
//! ```text
//! service read (profile:{id})
//!     → ttl.rs get (hit → return, expired → lazily dropped)
//!     → on miss: resilient upstream call → ttl.rs set
//! sweeper task (every TTL) → purge expired entries until shutdown
//! ```
//!
//! # Design Decisions
//! - Pure time-based expiry, no size-based eviction
//! - Process-local, nothing persisted across restarts
//! - Sharded locking via DashMap: reads run concurrently, writes to a key
//!   exclude every other operation on that key

pub mod ttl;

pub use ttl::{CacheEntry, TtlCache, DEFAULT_TTL};
