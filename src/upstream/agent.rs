//! AI agent adapter.

use async_trait::async_trait;

use crate::domain::{AgentRequest, AgentResponse};
use crate::error::ServiceResult;
use crate::resilience::{CallContext, ResilientClient};
use crate::upstream::http::{fetch_json, normalize_base};
use crate::upstream::AgentCaller;

/// `POST {base}/v1/agent/invoke` with an [`AgentRequest`] body.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    resilient: ResilientClient,
}

impl AgentClient {
    pub fn new(http: reqwest::Client, base_url: &str, resilient: ResilientClient) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            resilient,
        }
    }

    pub fn resilient(&self) -> &ResilientClient {
        &self.resilient
    }
}

#[async_trait]
impl AgentCaller for AgentClient {
    async fn call(&self, ctx: &CallContext, request: &AgentRequest) -> ServiceResult<AgentResponse> {
        let url = format!("{}/v1/agent/invoke", self.base_url);
        self.resilient
            .call(ctx, || {
                fetch_json(self.http.post(&url).json(request), "agent response", &request.customer_id)
            })
            .await
    }
}
