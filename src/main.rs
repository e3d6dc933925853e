//! Assistant backend-for-agent (BFA)
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────┐
//!                      │                  ASSISTANT BFA                      │
//!   Client Request     │  ┌──────┐   ┌──────────┐   ┌──────────────────┐    │
//!   ───────────────────┼─▶│ http │──▶│ service  │──▶│    upstream      │────┼──▶ profile API
//!                      │  │router│   │assistant │   │    adapters      │────┼──▶ transactions API
//!   Client Response    │  └──────┘   └────┬─────┘   └────────┬─────────┘────┼──▶ AI agent
//!   ◀──────────────────┼─────────         │                  │              │
//!                      │            ┌─────▼─────┐   ┌────────▼─────────┐    │
//!                      │            │ TTL cache │   │    resilience    │    │
//!                      │            └───────────┘   │ bulkhead/breaker │    │
//!                      │                            │  retry + backoff │    │
//!                      │                            └──────────────────┘    │
//!                      │  config · observability · lifecycle                 │
//!                      └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use assistant_bfa::config;
use assistant_bfa::lifecycle;
use assistant_bfa::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "assistant-bfa", version, about = "Backend-for-agent for the business assistant")]
struct Cli {
    /// Path to a TOML config file; defaults plus environment otherwise.
    #[arg(short, long, env = "BFA_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match config::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("assistant-bfa: {e}");
            std::process::exit(2);
        }
    };

    logging::init_logging(&loaded.config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "assistant-bfa starting");
    loaded.log_ignored_overrides();

    let config = loaded.config;
    tracing::info!(
        bind_address = %config.server.bind_address,
        data_backend = config.data_backend.is_active(),
        max_retries = config.resilience.max_retries,
        max_concurrency = config.resilience.max_concurrency,
        cache_ttl_secs = config.cache.ttl_secs,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}
