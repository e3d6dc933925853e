//! Error responses.
//!
//! Every failure leaves the service as `{"error": "<message>"}` with the
//! status its [`ServiceError`] class maps to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::ServiceError;

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
        ServiceError::CircuitOpen { .. } | ServiceError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ServiceError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// `{"error": message}` with `status`.
pub fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        error_body(status, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::NotFound { resource: "profile".into(), id: "c".into() }, 404),
            (ServiceError::Validation { field: "message".into(), message: "empty".into() }, 400),
            (ServiceError::CircuitOpen { service: "agent".into() }, 503),
            (ServiceError::Cancelled { operation: "agent".into() }, 503),
            (ServiceError::Timeout { operation: "agent".into() }, 504),
            (
                ServiceError::ExternalService {
                    service: "agent".into(),
                    source: AttemptError::Status { status: 500, body: String::new() },
                },
                502,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status_for(&err).as_u16(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let res = ServiceError::CircuitOpen { service: "agent".into() }.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "circuit breaker open for service: agent");
    }
}
