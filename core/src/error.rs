//! Error types shared across the scanning pipeline.

use thiserror::Error;

use crate::limiter::LimiterClosed;

/// Errors returned by the management and directory collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The target does not exist (HTTP 404). For resources this means the
    /// resource was deleted after the event fired.
    #[error("not found")]
    NotFound,

    /// Credential rejected or missing permissions (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success response.
    #[error("API error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the platform, or the raw body.
        message: String,
    },

    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The rate limiter stopped admitting calls.
    #[error(transparent)]
    Limiter(#[from] LimiterClosed),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

/// Result type for collaborator calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure that aborts one subscription's scan for the current cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list change events for {subscription}: {source}")]
    ListEvents {
        subscription: String,
        #[source]
        source: ApiError,
    },
}

/// Failure that terminates the scheduler loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to enumerate subscriptions: {0}")]
    ListSubscriptions(#[source] ApiError),

    #[error("scan concurrency gate closed")]
    GateClosed,
}

/// Startup failure. Every variant is fatal.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to list tenants: {0}")]
    ListTenants(#[source] ApiError),

    #[error("no tenant is reachable with the current credential")]
    NoTenant,

    #[error("failed to enumerate subscriptions: {0}")]
    ListSubscriptions(#[source] ApiError),

    #[error("no subscription is reachable with the current credential")]
    NoSubscription,

    #[error("failed to load resource providers for {subscription}: {source}")]
    ListProviders {
        subscription: String,
        #[source]
        source: ApiError,
    },
}
