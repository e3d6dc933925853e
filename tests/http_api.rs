//! End-to-end tests of the HTTP API against mock upstreams.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assistant_bfa::cache::TtlCache;
use assistant_bfa::http::server::build_router;
use assistant_bfa::http::{AppState, X_REQUEST_ID};
use assistant_bfa::service::Assistant;
use assistant_bfa::upstream::{AgentClient, ProfileClient, TransactionsClient};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

mod common;

/// One mock serving profile, transactions and agent routes.
async fn start_upstreams(agent_calls: Arc<AtomicU32>) -> SocketAddr {
    common::start_programmable_backend(move |req| {
        let agent_calls = agent_calls.clone();
        async move {
            match (req.method.as_str(), req.target.as_str()) {
                ("GET", "/v1/customers/c-1/profile") => (200, common::profile_json("c-1")),
                ("GET", "/v1/customers/c-1/transactions") => (200, common::transactions_json()),
                ("GET", target) if target.ends_with("/transactions") => (200, "[]".into()),
                ("POST", "/v1/agent/invoke") => {
                    agent_calls.fetch_add(1, Ordering::SeqCst);
                    (200, common::agent_json())
                }
                _ => (404, r#"{"error":"not found"}"#.into()),
            }
        }
    })
    .await
}

fn app(addr: SocketAddr) -> Router {
    let http = common::http_client();
    let base = common::base_url(addr);
    let profile_rc = common::resilient("profile", 1, 10);
    let transactions_rc = common::resilient("transactions", 1, 10);
    let agent_rc = common::resilient("agent", 1, 10);

    let assistant = Assistant::new(
        Arc::new(ProfileClient::new(http.clone(), &base, profile_rc.clone())),
        Arc::new(TransactionsClient::new(http.clone(), &base, transactions_rc.clone())),
        Arc::new(AgentClient::new(http, &base, agent_rc.clone())),
        TtlCache::new(Duration::from_secs(60)),
    );
    build_router(AppState::new(
        Arc::new(assistant),
        vec![profile_rc, transactions_rc, agent_rc],
        Duration::from_secs(5),
    ))
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_assistant(customer_id: &str, body: &str) -> Request<Body> {
    Request::post(format!("/v1/assistant/{customer_id}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_assistant_round_trip() {
    let agent_calls = Arc::new(AtomicU32::new(0));
    let app = app(start_upstreams(agent_calls.clone()).await);

    let res = app
        .oneshot(post_assistant(
            "c-1",
            r#"{"message": "How is my cash flow?", "conversationId": "conv-9"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(&X_REQUEST_ID));
    let body = json_body(res).await;
    assert_eq!(body["conversationId"], "conv-9");
    assert_eq!(body["message"]["role"], "assistant");
    assert!(body["message"]["content"].as_str().unwrap().contains("cash flow"));
    assert_eq!(body["message"]["metadata"]["tokenUsage"]["total_tokens"], 725);
    assert_eq!(body["message"]["metadata"]["toolsUsed"][0], "cash_flow_analysis");
    assert_eq!(body["profile"]["customer_id"], "c-1");
    assert_eq!(agent_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_conversation_id_is_generated() {
    let app = app(start_upstreams(Arc::new(AtomicU32::new(0))).await);
    let res = app.oneshot(post_assistant("c-1", r#"{"message": "hi"}"#)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert!(uuid::Uuid::parse_str(body["conversationId"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = app(start_upstreams(Arc::new(AtomicU32::new(0))).await);
    let res = app
        .oneshot(
            Request::get("/v1/customers/c-1/profile")
                .header("x-request-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[&X_REQUEST_ID], "trace-abc");
    assert_eq!(json_body(res).await["credit_score"], 745);
}

#[tokio::test]
async fn test_unknown_customer_is_404() {
    let agent_calls = Arc::new(AtomicU32::new(0));
    let app = app(start_upstreams(agent_calls.clone()).await);

    let res = app
        .oneshot(post_assistant("nobody", r#"{"message": "hi"}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["error"], "profile not found: nobody");
    assert_eq!(agent_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bad_requests_are_400() {
    let addr = start_upstreams(Arc::new(AtomicU32::new(0))).await;

    let res = app(addr).oneshot(post_assistant("c-1", "{not json")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await["error"].is_string());

    let res = app(addr)
        .oneshot(post_assistant("c-1", r#"{"message": ""}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transactions_endpoint() {
    let app = app(start_upstreams(Arc::new(AtomicU32::new(0))).await);
    let res = app
        .oneshot(Request::get("/v1/customers/c-1/transactions").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[1]["type"], "debit");
}

#[tokio::test]
async fn test_healthz_reports_breakers() {
    let app = app(start_upstreams(Arc::new(AtomicU32::new(0))).await);
    let res = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["status"], "healthy");
    let names: Vec<_> = body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["profile", "transactions", "agent"]);
    assert_eq!(body["services"][0]["circuit"], "closed");
}

#[tokio::test]
async fn test_failing_agent_is_502() {
    let addr = common::start_programmable_backend(|req| async move {
        match req.target.as_str() {
            "/v1/customers/c-1/profile" => (200, common::profile_json("c-1")),
            "/v1/customers/c-1/transactions" => (200, common::transactions_json()),
            _ => (503, "overloaded".into()),
        }
    })
    .await;

    let res = app(addr).oneshot(post_assistant("c-1", r#"{"message": "hi"}"#)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(res).await["error"].as_str().unwrap().contains("[agent]"));
}
