//! Data shapes exchanged with upstreams and HTTP clients.

pub mod agent;
pub mod customer;
pub mod health;

pub use agent::{
    AgentRequest, AgentResponse, AssistantMessage, AssistantRequest, AssistantResponse,
    AssistantResult, MessageMetadata, TokenUsage,
};
pub use customer::{CategoryTotal, CustomerProfile, Transaction, TransactionSummary};
pub use health::{HealthStatus, ServiceHealth};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
