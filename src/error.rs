//! Error types
//!
//! Two layers: [`ProviderError`] classifies the outcome of a single provider
//! call, [`TeardownError`] is what aborts a whole run.

use crate::resource::ResourceType;
use thiserror::Error;

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, TeardownError>;

/// Classification of a failed provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The resource does not exist (any more).
    #[error("resource not found")]
    NotFound,

    /// The caller lacks permission, or the API is disabled for the project.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Timeout, rate limit, 5xx or network failure. Retried next pass.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Any other 4xx, e.g. a resource still in use by another resource.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The asynchronous operation finished, but with an error.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Locally detected structural error. The only fatal class.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The run was cancelled while the call was outstanding.
    #[error("cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Structural errors abort the run; everything else is per-item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Whether a retry with the same idempotency token may still succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Build an error from an HTTP status and (already extracted) message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 | 410 => Self::NotFound,
            401 | 403 => Self::PermissionDenied(message),
            408 | 429 => Self::Transient(format!("{status}: {message}")),
            500..=599 => Self::Transient(format!("{status}: {message}")),
            _ => Self::Rejected { status, message },
        }
    }
}

/// Errors that abort a teardown run.
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed list filter: {0}")]
    MalformedFilter(String),

    #[error("no driver registered for {0}")]
    MissingDriver(ResourceType),

    #[error("dependency cycle between steps: {0}")]
    DependencyCycle(String),

    #[error("{context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: ProviderError,
    },

    /// Raised to unwind the current pass. Never escapes [`crate::destroy::Reconciler::run`].
    #[error("teardown cancelled")]
    Cancelled,
}

impl TeardownError {
    pub fn provider(context: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            context: context.into(),
            source,
        }
    }
}
