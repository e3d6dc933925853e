//! AI agent and assistant API types.

use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerProfile, Transaction, TransactionSummary};

/// Body sent to the agent's invoke endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub customer_id: String,
    pub profile: CustomerProfile,
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TransactionSummary>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
}

/// LLM token consumption reported by the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// The agent's structured answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub tokens_used: TokenUsage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_executed: Vec<String>,
}

/// `POST /v1/assistant/{customer_id}` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub id: String,
    pub role: &'static str,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub metadata: MessageMetadata,
}

/// Response of the assistant endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub conversation_id: String,
    pub message: AssistantMessage,
    pub profile: CustomerProfile,
}

/// Service-level result before it is shaped for the API.
#[derive(Debug, Clone)]
pub struct AssistantResult {
    pub customer_id: String,
    pub profile: CustomerProfile,
    pub summary: TransactionSummary,
    pub recommendation: AgentResponse,
    pub processed_at_ms: u64,
}
