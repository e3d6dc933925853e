//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Stop accepting and drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::BfaConfig;
use crate::http::handlers;
use crate::http::request::{RequestIdLayer, X_REQUEST_ID};
use crate::resilience::ResilientClient;
use crate::service::Assistant;

/// Slack between the request deadline and the outer timeout layer, so the
/// handler's own deadline fires first and produces a proper error body.
const TIMEOUT_LAYER_SLACK: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    /// Dependencies reported by `/healthz`.
    pub clients: Arc<[ResilientClient]>,
    /// Deadline applied to every inbound request.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(assistant: Arc<Assistant>, clients: Vec<ResilientClient>, request_timeout: Duration) -> Self {
        Self {
            assistant,
            clients: clients.into(),
            request_timeout,
        }
    }
}

/// HTTP server for the assistant API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &BfaConfig, state: AppState) -> Self {
        tracing::debug!(
            request_timeout_secs = config.server.request_timeout_secs,
            "Building HTTP router"
        );
        Self {
            router: build_router(state),
        }
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let outer_timeout = state.request_timeout + TIMEOUT_LAYER_SLACK;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/v1/customers/{customer_id}/profile", get(handlers::get_profile))
        .route("/v1/customers/{customer_id}/transactions", get(handlers::get_transactions))
        .route("/v1/assistant/{customer_id}", post(handlers::assistant))
        .with_state(state)
        .layer(TimeoutLayer::new(outer_timeout))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get(&X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %request_id,
            )
        }))
        .layer(RequestIdLayer)
}
