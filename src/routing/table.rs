//! Routing table: the frozen target list plus its cumulative weight.

use crate::error::GatewayError;
use crate::routing::target::BackendTarget;

/// Ordered backend targets with a precomputed total weight.
///
/// Built once at startup and shared read-only (via `Arc`) by every request.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    targets: Vec<BackendTarget>,
    total_weight: u64,
}

impl RoutingTable {
    /// Build a table, rejecting an empty list or any zero weight.
    pub fn new(targets: Vec<BackendTarget>) -> Result<Self, GatewayError> {
        if targets.is_empty() {
            return Err(GatewayError::InvalidConfiguration(
                "backend list is empty".into(),
            ));
        }
        if let Some(zero) = targets.iter().find(|t| t.weight() == 0) {
            return Err(GatewayError::InvalidConfiguration(format!(
                "backend {} has weight 0",
                zero.address()
            )));
        }

        let total_weight = total_weight(&targets);
        Ok(Self {
            targets,
            total_weight,
        })
    }

    /// Parse `"address->weight"` entries into a table.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, GatewayError> {
        let targets = entries
            .iter()
            .map(|e| e.as_ref().parse())
            .collect::<Result<Vec<BackendTarget>, _>>()?;
        Self::new(targets)
    }

    pub fn targets(&self) -> &[BackendTarget] {
        &self.targets
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub(crate) fn total_weight(targets: &[BackendTarget]) -> u64 {
    targets.iter().map(|t| u64::from(t.weight())).sum()
}
