//! Weighted round-robin selection.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::GatewayError;
use crate::routing::target::BackendTarget;
use crate::routing::weighted_random::{checked_total, select};
use crate::routing::EndpointRouter;

/// Round-robin selector.
/// Stores an internal counter and walks the cumulative weights with it, so a
/// target with weight `w` is returned `w` times per cycle.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EndpointRouter for RoundRobin {
    fn route<'a>(&self, targets: &'a [BackendTarget]) -> Result<&'a BackendTarget, GatewayError> {
        let sum = checked_total(targets)?;
        let tick = self.counter.fetch_add(1, Ordering::Relaxed);
        select(targets, tick % sum).ok_or_else(|| {
            GatewayError::InvalidConfiguration("cannot route over an empty backend list".into())
        })
    }
}
