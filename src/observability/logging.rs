//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Honour `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - JSON format for production, pretty format for `debug`/`trace`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Whether `level` selects the human-readable formatter.
pub fn is_development_level(level: &str) -> bool {
    matches!(level.to_ascii_lowercase().as_str(), "debug" | "trace")
}

fn default_filter(level: &str) -> String {
    format!("assistant_bfa={level},tower_http={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if is_development_level(level) {
        registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
