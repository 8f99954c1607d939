//! Response relay.
//!
//! # Responsibilities
//! - Buffer the backend body and rebuild a `200 application/json` response
//! - Copy the backend `Content-Length` as an integer
//! - Apply the response filter, then write through the connection handle
//! - Fall back to `204 No Content` and close the connection on any failure
//! - Map outbound call failures to `502`/`504`

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

use crate::error::{GatewayError, RelayError};
use crate::filter::ResponseFilter;
use crate::http::request::InboundRequest;
use crate::net::ConnectionHandle;
use crate::observability::metrics::{self, Outcome};

/// Turns backend responses into client responses.
#[derive(Debug, Clone)]
pub struct ResponseRelay {
    filter: Arc<dyn ResponseFilter>,
    max_body_bytes: usize,
}

impl ResponseRelay {
    pub fn new(filter: Arc<dyn ResponseFilter>, max_body_bytes: usize) -> Self {
        Self {
            filter,
            max_body_bytes,
        }
    }

    /// Relay `upstream` to the client. Never fails: relay errors are logged
    /// and answered with 204 on a closing connection.
    pub async fn relay(
        &self,
        request: &InboundRequest,
        connection: ConnectionHandle,
        upstream: Response<Body>,
    ) {
        match self.build(upstream).await {
            Ok(response) => {
                metrics::record_outcome(Outcome::Relayed);
                connection.write(response, request.keep_alive());
            }
            Err(e) => {
                tracing::error!(
                    connection_id = %connection.id(),
                    peer = %connection.peer(),
                    error = %e,
                    "Failed to relay upstream response"
                );
                metrics::record_outcome(Outcome::RelayFailed);
                connection.write(no_content(), false);
            }
        }
    }

    /// Build the client-facing response for a backend response.
    pub async fn build(&self, upstream: Response<Body>) -> Result<Response<Body>, RelayError> {
        let (parts, body) = upstream.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| RelayError::Body(e.into()))?;

        let content_length = content_length(&parts.headers)?;

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(header::CONTENT_LENGTH, content_length)
            .body(Body::from(body))?;

        self.filter.filter(&mut response)?;
        Ok(response)
    }
}

fn content_length(headers: &axum::http::HeaderMap) -> Result<u64, RelayError> {
    let value = headers
        .get(header::CONTENT_LENGTH)
        .ok_or(RelayError::MissingContentLength)?;
    let text = value
        .to_str()
        .map_err(|_| RelayError::InvalidContentLength(String::from_utf8_lossy(value.as_bytes()).into_owned()))?;
    text.trim()
        .parse::<u64>()
        .map_err(|_| RelayError::InvalidContentLength(text.to_string()))
}

/// Minimal reply used when relaying fails.
pub fn no_content() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

/// Reply for an outbound call that never produced a response.
pub fn upstream_failure(error: &GatewayError) -> Response<Body> {
    let status = match error {
        GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
