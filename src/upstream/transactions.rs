//! Transactions API adapter.

use async_trait::async_trait;

use crate::domain::Transaction;
use crate::error::ServiceResult;
use crate::resilience::{CallContext, ResilientClient};
use crate::upstream::http::{fetch_json, normalize_base};
use crate::upstream::TransactionsFetcher;

/// `GET {base}/v1/customers/{id}/transactions`.
#[derive(Debug, Clone)]
pub struct TransactionsClient {
    http: reqwest::Client,
    base_url: String,
    resilient: ResilientClient,
}

impl TransactionsClient {
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
impl TransactionsFetcher for TransactionsClient {
    async fn get_transactions(&self, ctx: &CallContext, customer_id: &str) -> ServiceResult<Vec<Transaction>> {
        let url = format!("{}/v1/customers/{}/transactions", self.base_url, customer_id);
        self.resilient
            .call(ctx, || fetch_json(self.http.get(&url), "transactions", customer_id))
            .await
    }
}
