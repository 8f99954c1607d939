//! Request and response filters.
//!
//! # Data Flow
//! ```text
//! Outbound request built by the dispatcher
//!     → RequestFilter::filter (before the call leaves the process)
//!     → HTTP client
//!
//! Client response built by the relay
//!     → ResponseFilter::filter (before the write)
//!     → connection handle
//! ```
//!
//! # Design Decisions
//! - Filters are injected at construction, never discovered at runtime
//! - Filters mutate in place and do not own the message
//! - A failing response filter downgrades the reply to 204 No Content

pub mod headers;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::error::FilterError;

pub use headers::{HeaderRequestFilter, HeaderResponseFilter};

/// Mutates an outbound request before it is forwarded.
pub trait RequestFilter: Send + Sync + std::fmt::Debug {
    fn filter(&self, request: &mut Request<Body>) -> Result<(), FilterError>;
}

/// Mutates a client response before it is written.
pub trait ResponseFilter: Send + Sync + std::fmt::Debug {
    fn filter(&self, response: &mut Response<Body>) -> Result<(), FilterError>;
}

/// Filter that leaves the message untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFilter;

impl RequestFilter for NoopFilter {
    fn filter(&self, _request: &mut Request<Body>) -> Result<(), FilterError> {
        Ok(())
    }
}

impl ResponseFilter for NoopFilter {
    fn filter(&self, _response: &mut Response<Body>) -> Result<(), FilterError> {
        Ok(())
    }
}
