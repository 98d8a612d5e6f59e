//! Flight search filter

use crate::flight::Flight;
use serde::{Deserialize, Serialize};

/// Origin/destination prefix filter
///
/// Replaced as a whole; there are no partial updates of a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightFilter {
    /// Origin prefix (empty matches every origin)
    #[serde(default)]
    pub from: String,
    /// Destination prefix (empty matches every destination)
    #[serde(default)]
    pub to: String,
    /// Only urgent connections
    #[serde(default)]
    pub urgent: bool,
}

impl FlightFilter {
    /// Create a filter
    pub fn new(from: impl Into<String>, to: impl Into<String>, urgent: bool) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            urgent,
        }
    }

    /// Case-sensitive prefix match on origin and destination
    pub fn matches(&self, flight: &Flight) -> bool {
        flight.from.starts_with(&self.from) && flight.to.starts_with(&self.to)
    }

    /// Both origin and destination are set
    pub fn is_complete(&self) -> bool {
        !self.from.is_empty() && !self.to.is_empty()
    }

    /// Human-readable route, e.g. `From London to Paris.`
    pub fn route_description(&self) -> String {
        format!("From {} to {}.", self.from, self.to)
    }

    /// Same destination and urgency, different origin
    pub fn with_origin(&self, from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..self.clone()
        }
    }
}

impl Default for FlightFilter {
    fn default() -> Self {
        Self::new("London", "Paris", false)
    }
}
