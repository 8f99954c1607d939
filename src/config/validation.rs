//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Parse and check every backend entry
//! - Validate value ranges (queue > 0, core <= max)
//! - Check filter headers are representable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::filter::{HeaderRequestFilter, HeaderResponseFilter};
use crate::pool::PoolSize;
use crate::routing::BackendTarget;

/// A single semantic problem, tagged with the config field it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    validate_backends(&config.routing.backends, &mut errors);

    if HeaderValue::from_str(&config.gateway.id).is_err() {
        errors.push(ValidationError::new(
            "gateway.id",
            "must be a valid header value",
        ));
    }

    let size = PoolSize::from_config(&config.pool);
    if size.queue_capacity == 0 {
        errors.push(ValidationError::new("pool.queue_capacity", "must be greater than 0"));
    }
    if size.core_workers > size.max_workers {
        errors.push(ValidationError::new(
            "pool.core_workers",
            format!(
                "resolved core workers ({}) exceed max workers ({})",
                size.core_workers, size.max_workers
            ),
        ));
    }

    if config.upstream.max_body_bytes == 0 {
        errors.push(ValidationError::new("upstream.max_body_bytes", "must be greater than 0"));
    }

    if let Err(e) = HeaderRequestFilter::new(&config.filters.request_headers) {
        errors.push(ValidationError::new("filters.request_headers", e.to_string()));
    }
    if let Err(e) = HeaderResponseFilter::new(&config.filters.response_headers) {
        errors.push(ValidationError::new("filters.response_headers", e.to_string()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_backends(entries: &[String], errors: &mut Vec<ValidationError>) {
    if entries.is_empty() {
        errors.push(ValidationError::new("routing.backends", "at least one backend is required"));
        return;
    }

    for (i, entry) in entries.iter().enumerate() {
        let field = format!("routing.backends[{i}]");
        let target = match entry.parse::<BackendTarget>() {
            Ok(t) => t,
            Err(e) => {
                errors.push(ValidationError::new(field, e.to_string()));
                continue;
            }
        };

        if target.weight() == 0 {
            errors.push(ValidationError::new(&field, "weight must be greater than 0"));
        }

        match Url::parse(target.address()) {
            Ok(url) if url.scheme() == "http" && url.has_host() => {}
            Ok(url) => errors.push(ValidationError::new(
                &field,
                format!("{url} must be an absolute http:// URL"),
            )),
            Err(e) => errors.push(ValidationError::new(
                &field,
                format!("{:?} is not a URL: {e}", target.address()),
            )),
        }
    }
}
