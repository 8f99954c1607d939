//! Network-facing handles.
//!
//! # Data Flow
//! ```text
//! axum delivers a complete request
//!     → connection.rs (ConnectionHandle + ResponseSlot pair)
//!     → handle travels with the outbound call
//!     → handle.write(response, keep_alive) from the completion task
//!     → slot resolves, axum writes the bytes
//! ```
//!
//! # Design Decisions
//! - Listening, framing, and byte-level writes stay in axum/hyper
//! - A handle is written at most once; dropping it unwritten is observable

pub mod connection;

pub use connection::{is_keep_alive, ConnectionHandle, ConnectionId, ResponseSlot};
