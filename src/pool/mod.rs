//! Outbound work scheduling.
//!
//! # Data Flow
//! ```text
//! Inbound handler (event-loop task)
//!     → WorkerPool::execute
//!         → new worker            (below core size)
//!         → bounded queue         (room left)
//!         → new worker            (queue full, below max size)
//!         → caller runs the task  (queue full, at max size)
//! ```
//!
//! # Design Decisions
//! - Workers only start outbound calls; completion runs on its own task,
//!   so slow backends never occupy the accepting tasks
//! - Saturation never drops work; it slows the submitter instead
//! - Counters are atomics, the queue is a Tokio channel

pub mod executor;

pub use executor::{Execution, PoolSize, WorkerPool};
