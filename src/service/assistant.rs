//! The assistant service.

use std::sync::Arc;

use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::domain::{now_millis, AgentRequest, AssistantResult, CustomerProfile, Transaction, TransactionSummary};
use crate::error::{ServiceError, ServiceResult};
use crate::observability::metrics;
use crate::resilience::CallContext;
use crate::upstream::{AgentCaller, ProfileFetcher, TransactionsFetcher, Upstreams};

const PROFILE_CACHE: &str = "profile";

/// Longest accepted customer id.
const MAX_CUSTOMER_ID_LEN: usize = 128;

/// Combines profile, transactions and the agent into one answer.
pub struct Assistant {
    profiles: Arc<dyn ProfileFetcher>,
    transactions: Arc<dyn TransactionsFetcher>,
    agent: Arc<dyn AgentCaller>,
    profile_cache: TtlCache<CustomerProfile>,
}

impl Assistant {
    pub fn new(
        profiles: Arc<dyn ProfileFetcher>,
        transactions: Arc<dyn TransactionsFetcher>,
        agent: Arc<dyn AgentCaller>,
        profile_cache: TtlCache<CustomerProfile>,
    ) -> Self {
        Self {
            profiles,
            transactions,
            agent,
            profile_cache,
        }
    }

    pub fn from_upstreams(upstreams: &Upstreams, profile_cache: TtlCache<CustomerProfile>) -> Self {
        Self::new(
            upstreams.profiles.clone(),
            upstreams.transactions.clone(),
            upstreams.agent.clone(),
            profile_cache,
        )
    }

    pub fn profile_cache(&self) -> &TtlCache<CustomerProfile> {
        &self.profile_cache
    }

    /// Profile for `customer_id`, served from cache when fresh.
    ///
    /// Failures are never cached.
    pub async fn get_profile(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<CustomerProfile> {
        validate_customer_id(customer_id)?;

        let key = format!("profile:{customer_id}");
        if let Some(profile) = self.profile_cache.get(&key) {
            metrics::record_cache_hit(PROFILE_CACHE);
            tracing::debug!(customer_id, "Profile cache hit");
            return Ok(profile);
        }
        metrics::record_cache_miss(PROFILE_CACHE);

        let profile = self.profiles.get_profile(ctx, customer_id).await?;
        self.profile_cache.set(key, profile.clone());
        Ok(profile)
    }

    pub async fn get_transactions(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<Vec<Transaction>> {
        validate_customer_id(customer_id)?;
        self.transactions.get_transactions(ctx, customer_id).await
    }

    /// Answer `message` for `customer_id` with the agent.
    ///
    /// Profile and transactions are fetched concurrently; the first failure
    /// cancels the other fetch and is returned as-is.
    pub async fn respond(&self, ctx: &CallContext, customer_id: &str, message: &str) -> ServiceResult<AssistantResult> {
        let start = Instant::now();
        validate_customer_id(customer_id)?;
        if message.trim().is_empty() {
            return Err(ServiceError::Validation {
                field: "message".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Some(err) = ctx.err() {
            return Err(ServiceError::from_context("assistant", err));
        }

        let scope = ctx.child();
        let fetched = tokio::try_join!(
            self.get_profile(&scope, customer_id),
            self.get_transactions(&scope, customer_id),
        );
        let (profile, transactions) = fetched.inspect_err(|_| scope.cancel())?;

        let summary = TransactionSummary::from_transactions(&transactions);
        let request = AgentRequest {
            customer_id: customer_id.to_string(),
            profile: profile.clone(),
            transactions,
            summary: Some(summary.clone()),
            query: message.to_string(),
        };
        let recommendation = self.agent.call(ctx, &request).await?;

        let tokens = recommendation.tokens_used;
        metrics::record_tokens(tokens.prompt_tokens, tokens.completion_tokens);
        metrics::record_duration("assistant", start.elapsed());
        tracing::info!(
            customer_id,
            latency_ms = start.elapsed().as_millis() as u64,
            total_tokens = tokens.total_tokens,
            transactions = summary.count,
            "Assistant response ready"
        );

        Ok(AssistantResult {
            customer_id: customer_id.to_string(),
            profile,
            summary,
            recommendation,
            processed_at_ms: now_millis(),
        })
    }
}

/// Customer ids are path segments upstream: non-empty, ASCII alphanumerics,
/// `-` and `_` only.
pub fn validate_customer_id(customer_id: &str) -> ServiceResult<()> {
    let valid = !customer_id.is_empty()
        && customer_id.len() <= MAX_CUSTOMER_ID_LEN
        && customer_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::Validation {
            field: "customer_id".to_string(),
            message: format!("invalid customer id '{customer_id}'"),
        })
    }
}
