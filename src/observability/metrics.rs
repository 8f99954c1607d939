//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): finished requests by outcome
//! - `gateway_pool_submissions_total` (counter): pool placements by mode
//! - `gateway_upstream_duration_seconds` (histogram): outbound call latency
//!
//! Recording is a no-op until a recorder is installed, so unit tests and
//! embedders without Prometheus pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pool::Execution;

/// How a request left the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Backend response relayed with 200.
    Relayed,
    /// Backend answered but relay fell back to 204.
    RelayFailed,
    /// Outbound call failed or timed out.
    UpstreamFailed,
    /// Dispatch faulted before the call was made.
    HandlerFault,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Relayed => "relayed",
            Outcome::RelayFailed => "relay_failed",
            Outcome::UpstreamFailed => "upstream_failed",
            Outcome::HandlerFault => "handler_fault",
        }
    }
}

/// Install the Prometheus recorder with an HTTP scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_outcome(outcome: Outcome) {
    ::metrics::counter!("gateway_requests_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_submission(execution: Execution) {
    ::metrics::counter!("gateway_pool_submissions_total", "mode" => execution.as_str())
        .increment(1);
}

pub fn record_upstream_latency(started: Instant) {
    ::metrics::histogram!("gateway_upstream_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}
