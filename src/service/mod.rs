//! Assistant orchestration.
//!
//! # Data Flow
//! ```text
//! handler → Assistant.respond
//!             ├─ get_profile (TtlCache read-through) ─┐
//!             └─ get_transactions ────────────────────┤ try_join
//!                                                      ▼
//!                                      TransactionSummary::from_transactions
//!                                                      ▼
//!                                              AgentCaller.call
//! ```

pub mod assistant;

pub use assistant::{validate_customer_id, Assistant};
