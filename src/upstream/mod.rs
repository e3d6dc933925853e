//! Upstream adapters.
//!
//! # Data Flow
//! ```text
//! Assistant ──▶ ProfileFetcher ──────▶ ProfileClient | DataBackendClient
//!           ──▶ TransactionsFetcher ─▶ TransactionsClient | DataBackendClient
//!           ──▶ AgentCaller ─────────▶ AgentClient
//!                                        │
//!                                        ▼
//!                               ResilientClient.call (one per dependency)
//!                                        │
//!                                        ▼
//!                               reqwest attempt → classify status
//! ```
//!
//! # Design Decisions
//! - Each adapter performs exactly one network attempt per closure call;
//!   retries, breaking and bulkheading belong to its `ResilientClient`
//! - Breakers and bulkheads are created once in [`Upstreams::from_config`]
//!   and live for the whole process

pub mod agent;
pub mod data_backend;
pub mod http;
pub mod profile;
pub mod transactions;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BfaConfig;
use crate::domain::{AgentRequest, AgentResponse, CustomerProfile, Transaction};
use crate::error::ServiceResult;
use crate::resilience::{CallContext, ResilientClient};

pub use agent::AgentClient;
pub use data_backend::DataBackendClient;
pub use profile::ProfileClient;
pub use transactions::TransactionsClient;

/// Source of customer profiles.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn get_profile(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<CustomerProfile>;
}

/// Source of customer transactions.
#[async_trait]
pub trait TransactionsFetcher: Send + Sync {
    async fn get_transactions(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<Vec<Transaction>>;
}

/// The AI agent.
#[async_trait]
pub trait AgentCaller: Send + Sync {
    async fn call(&self, ctx: &CallContext, request: &AgentRequest) -> ServiceResult<AgentResponse>;
}

/// The wired set of upstream adapters.
#[derive(Clone)]
pub struct Upstreams {
    pub profiles: Arc<dyn ProfileFetcher>,
    pub transactions: Arc<dyn TransactionsFetcher>,
    pub agent: Arc<dyn AgentCaller>,
    /// Resilient clients in use, for health reporting.
    pub clients: Vec<ResilientClient>,
}

impl Upstreams {
    /// Build one breaker, bulkhead and retry policy per dependency.
    pub fn from_config(config: &BfaConfig) -> Result<Self, reqwest::Error> {
        let http = http::build_client(config.upstreams.http_timeout())?;
        let retry = config.resilience.retry_config();

        let agent_rc = ResilientClient::for_dependency("agent", retry);
        let agent = Arc::new(AgentClient::new(http.clone(), &config.upstreams.agent_url, agent_rc.clone()));

        let upstreams = if config.data_backend.is_active() {
            let rc = ResilientClient::for_dependency("data-backend", retry);
            let backend = Arc::new(DataBackendClient::new(http, &config.data_backend, rc.clone()));
            tracing::info!(url = %config.data_backend.url, "Using data backend for profiles and transactions");
            Self {
                profiles: backend.clone(),
                transactions: backend,
                agent,
                clients: vec![rc, agent_rc],
            }
        } else {
            let profile_rc = ResilientClient::for_dependency("profile", retry);
            let transactions_rc = ResilientClient::for_dependency("transactions", retry);
            Self {
                profiles: Arc::new(ProfileClient::new(
                    http.clone(),
                    &config.upstreams.profile_url,
                    profile_rc.clone(),
                )),
                transactions: Arc::new(TransactionsClient::new(
                    http,
                    &config.upstreams.transactions_url,
                    transactions_rc.clone(),
                )),
                agent,
                clients: vec![profile_rc, transactions_rc, agent_rc],
            }
        };

        for client in &upstreams.clients {
            tracing::info!(
                service = client.name(),
                max_retries = retry.max_retries,
                max_concurrency = retry.max_concurrency,
                "Upstream dependency configured"
            );
        }
        Ok(upstreams)
    }
}
