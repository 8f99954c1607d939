//! Weighted-random HTTP reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                      GATEWAY                          │
//!                         │                                                       │
//!   Client Request        │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!   ──────────────────────┼─▶│ inbound  │──▶│ dispatcher │──▶│   routing     │   │
//!                         │  │ handler  │   │  + filter  │   │ weighted rand │   │
//!                         │  └────┬─────┘   └─────┬──────┘   └───────────────┘   │
//!                         │       │               │                              │
//!                         │       │               ▼                              │
//!                         │       │        ┌─────────────┐    ┌─────────────┐    │
//!                         │       │        │ worker pool │───▶│ hyper client│────┼──▶ Backend
//!                         │       │        │ caller-runs │    └──────┬──────┘    │
//!                         │       │        └─────────────┘           │           │
//!                         │       ▼                                  ▼           │
//!   Client Response       │  ┌──────────┐                    ┌─────────────┐     │
//!   ◀─────────────────────┼──│connection│◀───────────────────│   relay     │◀────┼─── Backend
//!                         │  │  handle  │                    │ + filter    │     │
//!                         │  └──────────┘                    └─────────────┘     │
//!                         └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pool;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
