//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (metrics, cache sweeper)
//! - Bind the listener and begin accepting traffic
//! - Run until a signal arrives, then shut down in order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::TtlCache;
use crate::config::BfaConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::service::Assistant;
use crate::upstream::Upstreams;

/// Time allowed for in-flight requests to finish after a signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the service with a validated `config` until shutdown.
pub async fn run(config: BfaConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let upstreams = Upstreams::from_config(&config)?;
    let shutdown = Shutdown::new();

    let profile_cache = TtlCache::new(config.cache.ttl());
    let sweeper = profile_cache.spawn_sweeper(shutdown.subscribe());

    let assistant = Arc::new(Assistant::from_upstreams(&upstreams, profile_cache));
    let state = AppState::new(assistant, upstreams.clients.clone(), config.server.request_timeout());
    let server = HttpServer::new(&config, state);

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.server.bind_address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let serve = server.run(listener, shutdown.subscribe());
    tokio::pin!(serve);

    let finished = tokio::select! {
        res = &mut serve => Some(res),
        _ = signals::wait_for_signal() => None,
    };
    let outcome = match finished {
        Some(res) => res,
        None => {
            shutdown.trigger();
            match tokio::time::timeout(DRAIN_TIMEOUT, &mut serve).await {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Drain timed out, forcing exit");
                    Ok(())
                }
            }
        }
    };

    shutdown.trigger();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Cache sweeper task failed");
    }

    outcome?;
    tracing::info!("Shutdown complete");
    Ok(())
}
