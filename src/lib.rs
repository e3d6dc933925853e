//! Backend-for-agent service library.
//!
//! Fault-tolerant access to the profile, transactions and AI agent
//! services, plus the HTTP API that combines them.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod service;
pub mod upstream;

pub use config::BfaConfig;
pub use error::{AttemptError, ServiceError, ServiceResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{CallContext, ResilientClient};
