//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum/hyper framing)
//!     → server.rs (inbound handler, request ID, fault boundary)
//!     → dispatcher.rs (route, build + filter outbound request)
//!     → pool (bounded workers, caller-runs under saturation)
//!     → client.rs (shared hyper client, async completion)
//!     → response.rs (buffer, rewrite headers, filter)
//!     → connection handle → client
//! ```

pub mod client;
pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

use axum::http::HeaderName;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub use client::{HyperClient, OutboundClient};
pub use dispatcher::Dispatcher;
pub use request::InboundRequest;
pub use response::ResponseRelay;
pub use server::HttpServer;
