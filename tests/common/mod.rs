//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assistant_bfa::resilience::{ResilientClient, RetryConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock backend saw.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    /// Path and query.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            204 => "204 No Content",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always answers `status` with `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    Some(MockRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Fast retry settings for tests.
pub fn retry(max_retries: u32, max_concurrency: usize) -> RetryConfig {
    RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(5),
        max_concurrency,
    }
}

pub fn resilient(name: &str, max_retries: u32, max_concurrency: usize) -> ResilientClient {
    ResilientClient::for_dependency(name, retry(max_retries, max_concurrency))
}

pub fn http_client() -> reqwest::Client {
    assistant_bfa::upstream::http::build_client(Duration::from_secs(5)).unwrap()
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

pub fn profile_json(customer_id: &str) -> String {
    serde_json::json!({
        "customer_id": customer_id,
        "name": "Padaria Estrela",
        "document": "12.345.678/0001-90",
        "segment": "small_business",
        "monthly_revenue": 85000.0,
        "account_age_months": 30,
        "credit_score": 745
    })
    .to_string()
}

pub fn transactions_json() -> String {
    serde_json::json!([
        {"id": "t-1", "date": "2024-05-02T09:00:00Z", "amount": 5000.0, "type": "pix_received", "category": "sales", "description": "daily sales"},
        {"id": "t-2", "date": "2024-05-03T12:00:00Z", "amount": -1200.0, "type": "debit", "category": "suppliers", "description": "flour"},
        {"id": "t-3", "date": "2024-05-04T15:00:00Z", "amount": -300.0, "type": "bill_payment", "category": "utilities", "description": "power"}
    ])
    .to_string()
}

pub fn agent_json() -> String {
    serde_json::json!({
        "answer": "Your cash flow is positive; consider prepaying suppliers for a discount.",
        "reasoning": "credits exceed debits by 3500",
        "confidence": 0.82,
        "tokens_used": {"prompt_tokens": 640, "completion_tokens": 85, "total_tokens": 725},
        "tools_executed": ["cash_flow_analysis"]
    })
    .to_string()
}
