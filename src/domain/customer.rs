//! Customer profile and transaction types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A business customer's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub name: String,
    /// Company registration number.
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub segment: String,
    #[serde(default)]
    pub monthly_revenue: f64,
    #[serde(default, rename = "account_age_months")]
    pub account_age: u32,
    #[serde(default)]
    pub credit_score: u32,
}

/// A single account movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// RFC 3339 timestamp as reported upstream.
    pub date: String,
    pub amount: f64,
    /// `credit`, `debit`, `pix_received`, `pix_sent`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
}

impl Transaction {
    /// Whether the movement adds money to the account.
    pub fn is_credit(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "credit" | "pix_received" | "transfer_in"
        ) || (self.amount > 0.0 && !self.is_known_debit())
    }

    fn is_known_debit(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "debit" | "pix_sent" | "transfer_out" | "debit_purchase" | "credit_purchase" | "bill_payment"
        )
    }
}

/// Spending per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

/// Aggregated view of a transaction list, sent to the agent as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_credits: f64,
    pub total_debits: f64,
    pub balance: f64,
    pub count: usize,
    #[serde(rename = "top_categories", skip_serializing_if = "Vec::is_empty", default)]
    pub top_categories: Vec<CategoryTotal>,
}

impl TransactionSummary {
    /// Number of categories reported in `top_categories`.
    pub const TOP_CATEGORIES: usize = 5;

    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut summary = Self {
            count: transactions.len(),
            ..Self::default()
        };
        let mut spending: HashMap<&str, (f64, usize)> = HashMap::new();

        for tx in transactions {
            let amount = tx.amount.abs();
            if tx.is_credit() {
                summary.total_credits += amount;
            } else {
                summary.total_debits += amount;
                let category = if tx.category.is_empty() { "other" } else { tx.category.as_str() };
                let slot = spending.entry(category).or_insert((0.0, 0));
                slot.0 += amount;
                slot.1 += 1;
            }
        }
        summary.balance = summary.total_credits - summary.total_debits;

        let mut top: Vec<CategoryTotal> = spending
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category: category.to_string(),
                total,
                count,
            })
            .collect();
        top.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
        top.truncate(Self::TOP_CATEGORIES);
        summary.top_categories = top;

        summary
    }
}
