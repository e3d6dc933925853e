//! Profile API adapter.

use async_trait::async_trait;

use crate::domain::CustomerProfile;
use crate::error::ServiceResult;
use crate::resilience::{CallContext, ResilientClient};
use crate::upstream::http::{fetch_json, normalize_base};
use crate::upstream::ProfileFetcher;

/// `GET {base}/v1/customers/{id}/profile`.
#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: reqwest::Client,
    base_url: String,
    resilient: ResilientClient,
}

impl ProfileClient {
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
impl ProfileFetcher for ProfileClient {
    async fn get_profile(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<CustomerProfile> {
        let url = format!("{}/v1/customers/{}/profile", self.base_url, customer_id);
        self.resilient
            .call(ctx, || fetch_json(self.http.get(&url), "profile", customer_id))
            .await
    }
}
