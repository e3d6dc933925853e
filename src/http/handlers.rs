//! Route handlers.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::domain::{
    AssistantMessage, AssistantRequest, AssistantResponse, HealthStatus, MessageMetadata, ServiceHealth,
};
use crate::error::ServiceResult;
use crate::http::request::RequestId;
use crate::http::response::error_body;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::CallContext;

/// `GET /healthz`: breaker state of every dependency.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthStatus> {
    let services = state
        .clients
        .iter()
        .map(|client| ServiceHealth::from_circuit(client.name(), client.circuit_state(), client.bulkhead().available()))
        .collect();
    Json(HealthStatus::from_services(services))
}

/// `GET /v1/customers/{customer_id}/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(customer_id): Path<String>,
) -> Response {
    let start = Instant::now();
    let ctx = state.request_context();
    let result = state.assistant.get_profile(&ctx, &customer_id).await;
    finish("get_profile", &request_id, start, result.map(Json))
}

/// `GET /v1/customers/{customer_id}/transactions`
pub async fn get_transactions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(customer_id): Path<String>,
) -> Response {
    let start = Instant::now();
    let ctx = state.request_context();
    let result = state.assistant.get_transactions(&ctx, &customer_id).await;
    finish("get_transactions", &request_id, start, result.map(Json))
}

/// `POST /v1/assistant/{customer_id}`
pub async fn assistant(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(customer_id): Path<String>,
    body: Result<Json<AssistantRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            metrics::record_request("error");
            return error_body(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let ctx = state.request_context();
    let result = state
        .assistant
        .respond(&ctx, &customer_id, &body.message)
        .await
        .map(|result| {
            let metadata = MessageMetadata {
                tools_used: result.recommendation.tools_executed,
                token_usage: result.recommendation.tokens_used,
                latency_ms: start.elapsed().as_millis() as u64,
                reasoning: result.recommendation.reasoning,
            };
            Json(AssistantResponse {
                conversation_id: body
                    .conversation_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                message: AssistantMessage {
                    id: Uuid::new_v4().to_string(),
                    role: "assistant",
                    content: result.recommendation.answer,
                    timestamp: result.processed_at_ms,
                    metadata,
                },
                profile: result.profile,
            })
        });
    finish("assistant", &request_id, start, result)
}

fn finish<T: IntoResponse>(
    operation: &'static str,
    request_id: &RequestId,
    start: Instant,
    result: ServiceResult<T>,
) -> Response {
    metrics::record_duration(operation, start.elapsed());
    match result {
        Ok(body) => {
            metrics::record_request("success");
            body.into_response()
        }
        Err(err) => {
            metrics::record_request("error");
            tracing::debug!(request_id = %request_id, operation, error = %err, "Handler returned error");
            err.into_response()
        }
    }
}

impl AppState {
    /// A context scoped to one inbound request.
    fn request_context(&self) -> CallContext {
        CallContext::with_timeout(self.request_timeout)
    }
}

