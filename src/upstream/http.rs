//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::AttemptError;

const USER_AGENT: &str = concat!("assistant-bfa/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an [`AttemptError`].
const MAX_ERROR_BODY: usize = 512;

/// Client shared by all adapters; `timeout` bounds each single attempt.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Strip a trailing slash so paths can be appended with `format!`.
pub fn normalize_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send `request` and decode a JSON body of type `T`.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    resource: &str,
    id: &str,
) -> Result<T, AttemptError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    decode(status, &body, resource, id)
}

/// Map a status and body to the attempt outcome.
///
/// 2xx decodes, 404 is `NotFound`, other 4xx is `Validation`, anything
/// else is `Status`.
pub fn decode<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
    resource: &str,
    id: &str,
) -> Result<T, AttemptError> {
    if status.is_success() {
        return Ok(serde_json::from_slice(body)?);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(AttemptError::not_found(resource, id));
    }

    let text = truncate(body);
    if status.is_client_error() {
        Err(AttemptError::Validation {
            status: status.as_u16(),
            message: text,
        })
    } else {
        Err(AttemptError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}

fn truncate(body: &[u8]) -> String {
    let end = body.len().min(MAX_ERROR_BODY);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
