//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layers, graceful shutdown)
//!     → request.rs (request ID generated or propagated)
//!     → handlers.rs (per-request CallContext with the request deadline)
//!     → service::Assistant
//!     → response.rs (ServiceError → status code + JSON body)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
