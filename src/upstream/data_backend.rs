//! PostgREST data backend adapter.
//!
//! Serves both the profile and the transactions ports from the
//! `customer_profiles` and `customer_transactions` tables.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::DataBackendConfig;
use crate::domain::{CustomerProfile, Transaction};
use crate::error::{AttemptError, ServiceResult};
use crate::resilience::{CallContext, ResilientClient};
use crate::upstream::http::{decode, normalize_base};
use crate::upstream::{ProfileFetcher, TransactionsFetcher};

/// Most recent transactions returned per customer.
const TRANSACTIONS_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct DataBackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
    resilient: ResilientClient,
}

impl DataBackendClient {
    pub fn new(http: reqwest::Client, config: &DataBackendConfig, resilient: ResilientClient) -> Self {
        Self {
            http,
            base_url: normalize_base(&config.url),
            api_key: config.anon_key.clone(),
            bearer: config.bearer_key().to_string(),
            resilient,
        }
    }

    pub fn resilient(&self) -> &ResilientClient {
        &self.resilient
    }

    /// `GET {base}/rest/v1/{path}` with the PostgREST auth headers.
    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .header("Prefer", "return=representation")
    }

    /// Fetch rows; 404 and 204 mean "no rows".
    async fn rows<T: DeserializeOwned>(&self, path: &str, resource: &str, id: &str) -> Result<Vec<T>, AttemptError> {
        let response = self.get(path).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let body = response.bytes().await?;
        decode(status, &body, resource, id)
    }
}

#[async_trait]
impl ProfileFetcher for DataBackendClient {
    async fn get_profile(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<CustomerProfile> {
        let path = format!("customer_profiles?customer_id=eq.{customer_id}&limit=1");
        let path = path.as_str();
        self.resilient
            .call(ctx, || async move {
                let rows: Vec<CustomerProfile> = self.rows(path, "profile", customer_id).await?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| AttemptError::not_found("profile", customer_id))
            })
            .await
    }
}

#[async_trait]
impl TransactionsFetcher for DataBackendClient {
    async fn get_transactions(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<Vec<Transaction>> {
        let path = format!(
            "customer_transactions?customer_id=eq.{customer_id}&order=date.desc&limit={TRANSACTIONS_LIMIT}"
        );
        self.resilient
            .call(ctx, || self.rows(&path, "transactions", customer_id))
            .await
    }
}
