//! Gateway error taxonomy.
//!
//! Only `InvalidConfiguration` is allowed to be fatal, and only at startup.
//! Every other variant is a per-request fault that is logged at the inbound
//! boundary and never reaches the listener.

use thiserror::Error;

/// Boxed error from an external collaborator (HTTP client, body stream).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or empty backend list, or otherwise unusable settings.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The outbound call failed (connect, protocol, or I/O error).
    #[error("upstream call to {url} failed: {source}")]
    Dispatch {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The outbound call exceeded `upstream.timeout_ms`.
    #[error("upstream call to {url} timed out after {elapsed_ms}ms")]
    Timeout { url: String, elapsed_ms: u64 },

    /// The backend answered but its response could not be relayed.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// A request or response filter rejected the message.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Failures while turning a backend response into a client response.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to read upstream body: {0}")]
    Body(#[source] BoxError),

    #[error("upstream response carries no Content-Length")]
    MissingContentLength,

    #[error("upstream Content-Length {0:?} is not an integer")]
    InvalidContentLength(String),

    #[error("failed to build client response: {0}")]
    Build(#[from] axum::http::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Failure raised by a [`RequestFilter`](crate::filter::RequestFilter) or
/// [`ResponseFilter`](crate::filter::ResponseFilter).
#[derive(Debug, Error)]
#[error("filter {filter} failed: {reason}")]
pub struct FilterError {
    pub filter: &'static str,
    pub reason: String,
}

impl FilterError {
    pub fn new(filter: &'static str, reason: impl Into<String>) -> Self {
        Self {
            filter,
            reason: reason.into(),
        }
    }
}
