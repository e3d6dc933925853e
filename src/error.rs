//! Error taxonomy shared by the upstream adapters and the service layer.

use thiserror::Error;

use crate::resilience::{CircuitOpenError, ContextError};

/// Failure of a single upstream attempt.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The upstream answered 404 (or an empty result set).
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Any other 4xx.
    #[error("upstream rejected request with status {status}: {message}")]
    Validation { status: u16, message: String },

    /// 5xx or an unexpected status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl AttemptError {
    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether the failure is worth retrying.
    ///
    /// The retrier does not consult this; every failure spends the budget.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Status { .. } => true,
            Self::Context(ContextError::DeadlineExceeded) => true,
            Self::NotFound { .. }
            | Self::Validation { .. }
            | Self::Decode(_)
            | Self::Context(ContextError::Cancelled)
            | Self::CircuitOpen(_) => false,
        }
    }
}

/// Terminal outcome of an upstream call, as seen by the service layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The retry budget was spent; tagged with the dependency name.
    #[error("external service error [{service}]: {source}")]
    ExternalService {
        service: String,
        #[source]
        source: AttemptError,
    },

    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// The breaker refused dispatch; callers should fail fast.
    #[error("circuit breaker open for service: {service}")]
    CircuitOpen { service: String },

    /// Bad caller input.
    #[error("validation error on '{field}': {message}")]
    Validation { field: String, message: String },
}

impl ServiceError {
    pub fn from_context(operation: &str, err: ContextError) -> Self {
        match err {
            ContextError::DeadlineExceeded => Self::Timeout {
                operation: operation.to_string(),
            },
            ContextError::Cancelled => Self::Cancelled {
                operation: operation.to_string(),
            },
        }
    }

    /// Classify the final error of an upstream call made to `service`.
    pub fn from_attempt(service: &str, err: AttemptError) -> Self {
        match err {
            AttemptError::NotFound { resource, id } => Self::NotFound { resource, id },
            AttemptError::Context(cause) => Self::from_context(service, cause),
            AttemptError::CircuitOpen(_) => Self::CircuitOpen {
                service: service.to_string(),
            },
            other => Self::ExternalService {
                service: service.to_string(),
                source: other,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for service-level operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
