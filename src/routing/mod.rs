//! Endpoint routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ["http://a:8080->5", "http://b:8080->1"]
//!     → target.rs (parse "address->weight")
//!     → table.rs (freeze list + total weight)
//!     → shared via Arc to the dispatcher
//!
//! Per request:
//!     RoutingTable
//!     → EndpointRouter::route (weighted_random.rs or round_robin.rs)
//!     → one BackendTarget
//! ```
//!
//! # Design Decisions
//! - Table is immutable after construction (thread-safe without locks)
//! - Weighted random keeps no state between calls; each call draws once
//! - Selection walks cumulative weights with a strict `<` comparison

pub mod round_robin;
pub mod table;
pub mod target;
pub mod weighted_random;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GatewayError;

pub use round_robin::RoundRobin;
pub use table::RoutingTable;
pub use target::BackendTarget;
pub use weighted_random::{route, WeightedRandom};

/// Selects one backend target per call.
pub trait EndpointRouter: Send + Sync + std::fmt::Debug {
    /// Returns the selected target, or `InvalidConfiguration` when the list
    /// is empty or carries no weight.
    fn route<'a>(&self, targets: &'a [BackendTarget]) -> Result<&'a BackendTarget, GatewayError>;
}

/// Configured selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    #[default]
    WeightedRandom,
    RoundRobin,
}

impl RoutingPolicy {
    /// Instantiate the router for this policy.
    pub fn build(self) -> Arc<dyn EndpointRouter> {
        match self {
            RoutingPolicy::WeightedRandom => Arc::new(WeightedRandom::new()),
            RoutingPolicy::RoundRobin => Arc::new(RoundRobin::new()),
        }
    }
}
