//! Backend target definition.
//!
//! # Responsibilities
//! - Represent a single weighted backend address
//! - Parse the `"<address>-><weight>"` configuration form
//! - Strip the trailing slash once, so URL joining never doubles it

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// Separator between address and weight in a configuration entry.
pub const WEIGHT_SEPARATOR: &str = "->";

/// A weighted backend endpoint. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    address: String,
    weight: u32,
}

impl BackendTarget {
    /// Create a target without validating the weight.
    ///
    /// Weight checks happen where the target set is assembled
    /// ([`RoutingTable::new`](crate::routing::RoutingTable::new)) and where it
    /// is consumed ([`route`](crate::routing::route)).
    pub fn new(address: impl Into<String>, weight: u32) -> Self {
        Self {
            address: address.into(),
            weight,
        }
    }

    /// The address exactly as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The address with one trailing `/` removed.
    pub fn base_address(&self) -> &str {
        self.address.strip_suffix('/').unwrap_or(&self.address)
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

impl FromStr for BackendTarget {
    type Err = GatewayError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let (address, weight) = entry.split_once(WEIGHT_SEPARATOR).ok_or_else(|| {
            GatewayError::InvalidConfiguration(format!(
                "backend entry {entry:?} is missing the {WEIGHT_SEPARATOR:?} separator"
            ))
        })?;

        let address = address.trim();
        if address.is_empty() {
            return Err(GatewayError::InvalidConfiguration(format!(
                "backend entry {entry:?} has an empty address"
            )));
        }

        let weight = weight.trim().parse::<u32>().map_err(|e| {
            GatewayError::InvalidConfiguration(format!(
                "backend entry {entry:?} has a malformed weight: {e}"
            ))
        })?;

        Ok(Self::new(address, weight))
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.address, WEIGHT_SEPARATOR, self.weight)
    }
}
