//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::RoutingPolicy;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend list and selection policy.
    pub routing: RoutingConfig,

    /// Identity advertised to backends.
    pub gateway: IdentityConfig,

    /// Outbound worker pool sizing.
    pub pool: PoolConfig,

    /// Outbound call settings.
    pub upstream: UpstreamConfig,

    /// Header filters.
    pub filters: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
        }
    }
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Selection policy.
    pub policy: RoutingPolicy,

    /// Backends as `"<address>-><weight>"`, e.g. `"http://10.0.0.1:8080->5"`.
    pub backends: Vec<String>,
}

/// Gateway identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Sent to backends as the `X-FROM` header.
    pub id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            id: "http-gateway".to_string(),
        }
    }
}

/// Worker pool sizing. Zero worker counts mean "derive from CPU count".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Core workers; 0 = 2 × (cores + 1).
    pub core_workers: usize,

    /// Maximum workers; 0 = 4 × (cores + 1).
    pub max_workers: usize,

    /// Bounded queue capacity.
    pub queue_capacity: usize,

    /// Idle time before a worker above the core count retires.
    pub keep_alive_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_workers: 0,
            max_workers: 0,
            queue_capacity: 2048,
            keep_alive_ms: 1000,
        }
    }
}

/// Outbound call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-call timeout in milliseconds; 0 disables it.
    pub timeout_ms: u64,

    /// Largest backend body the relay will buffer.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Header filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Headers added to every outbound request.
    pub request_headers: BTreeMap<String, String>,

    /// Headers added to every client response.
    pub response_headers: BTreeMap<String, String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8888");
        assert_eq!(config.routing.policy, RoutingPolicy::WeightedRandom);
        assert!(config.routing.backends.is_empty());
        assert_eq!(config.gateway.id, "http-gateway");
        assert_eq!(config.pool.queue_capacity, 2048);
        assert_eq!(config.upstream.timeout_ms, 0);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn parses_full_document() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [routing]
            policy = "round_robin"
            backends = ["http://10.0.0.1:8080->5", "http://10.0.0.2:8080->1"]

            [gateway]
            id = "edge-1"

            [pool]
            core_workers = 4
            max_workers = 8
            queue_capacity = 16

            [filters.response_headers]
            x-served-by = "edge-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.routing.policy, RoutingPolicy::RoundRobin);
        assert_eq!(config.routing.backends.len(), 2);
        assert_eq!(config.gateway.id, "edge-1");
        assert_eq!(config.pool.core_workers, 4);
        assert_eq!(config.pool.keep_alive_ms, 1000);
        assert_eq!(config.filters.response_headers["x-served-by"], "edge-1");
    }
}
