//! Weighted random endpoint selection.

use rand::Rng;

use crate::error::GatewayError;
use crate::routing::table::total_weight;
use crate::routing::target::BackendTarget;
use crate::routing::EndpointRouter;

/// Pick one target with probability proportional to its weight.
///
/// Each call performs its own draw from the thread-local RNG, so this is safe
/// to call from any number of requests at once.
pub fn route(targets: &[BackendTarget]) -> Result<&BackendTarget, GatewayError> {
    let sum = checked_total(targets)?;
    let draw = rand::thread_rng().gen_range(0..sum);
    select(targets, draw).ok_or_else(|| {
        GatewayError::InvalidConfiguration("cannot route over an empty backend list".into())
    })
}

/// Walk the cumulative weights and return the first target whose running
/// sum exceeds `draw`.
///
/// `draw` should be in `0..total_weight(targets)`. Anything past the end
/// falls back to the last target; an empty list yields `None`.
pub(crate) fn select(targets: &[BackendTarget], draw: u64) -> Option<&BackendTarget> {
    let mut cumulative = 0u64;
    for target in targets {
        cumulative += u64::from(target.weight());
        if draw < cumulative {
            return Some(target);
        }
    }
    targets.last()
}

pub(crate) fn checked_total(targets: &[BackendTarget]) -> Result<u64, GatewayError> {
    if targets.is_empty() {
        return Err(GatewayError::InvalidConfiguration(
            "cannot route over an empty backend list".into(),
        ));
    }
    match total_weight(targets) {
        0 => Err(GatewayError::InvalidConfiguration(
            "cannot route when total backend weight is 0".into(),
        )),
        sum => Ok(sum),
    }
}

/// Stateless weighted random policy. This is the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self
    }
}

impl EndpointRouter for WeightedRandom {
    fn route<'a>(&self, targets: &'a [BackendTarget]) -> Result<&'a BackendTarget, GatewayError> {
        route(targets)
    }
}
