//! Request handling and transformation.
//!
//! # Responsibilities
//! - Capture an immutable view of the inbound request (method, URI, version)
//! - Record keep-alive intent before anything mutates headers
//! - Join the backend base address with the inbound path and query
//! - Build the outbound GET carrying `Connection` and `X-FROM`
//!
//! # Design Decisions
//! - The inbound body is released as soon as the view is taken
//! - Outbound requests are always GET; inbound bodies are not forwarded

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Uri, Version};

use crate::error::GatewayError;
use crate::net::is_keep_alive;
use crate::routing::BackendTarget;

/// Identifies this gateway to backends.
pub const X_FROM: HeaderName = HeaderName::from_static("x-from");

/// Immutable view of one inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    version: Version,
    keep_alive: bool,
}

impl InboundRequest {
    /// Take the request head. The body is dropped here, so its buffer is
    /// released on every path out of the handler.
    pub fn from_request(request: Request<Body>) -> Self {
        let (parts, _body) = request.into_parts();
        let keep_alive = is_keep_alive(parts.version, &parts.headers);
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            keep_alive,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Whether the client asked for a persistent connection.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Path plus query, always starting with `/`.
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| pq.starts_with('/'))
            .unwrap_or("/")
    }
}

/// `base address without trailing slash` + `path and query`.
pub fn outbound_url(target: &BackendTarget, path_and_query: &str) -> String {
    format!("{}{}", target.base_address(), path_and_query)
}

/// Build the outbound GET for `url`.
pub fn build_outbound_request(url: &str, gateway_id: &HeaderValue) -> Result<Request<Body>, GatewayError> {
    let uri: Uri = url.parse().map_err(|e| {
        GatewayError::InvalidConfiguration(format!("outbound URL {url:?} is invalid: {e}"))
    })?;

    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
        .header(X_FROM, gateway_id.clone())
        .body(Body::empty())
        .map_err(|e| GatewayError::InvalidConfiguration(format!("cannot build request for {url}: {e}")))
}
