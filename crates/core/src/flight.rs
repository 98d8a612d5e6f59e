//! Flight records and their identity
//!
//! A `Flight` is an immutable value. Editing a flight means building a new
//! value (see `with_delay`), never mutating a cached one in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a flight
///
/// Zero is reserved: the placeholder record uses it and the active-identity
/// loader ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(u64);

impl FlightId {
    /// The reserved "no flight" identity
    pub const UNSET: FlightId = FlightId(0);

    /// Create an identity from its raw value
    pub const fn new(raw: u64) -> Self {
        FlightId(raw)
    }

    /// Raw numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved zero identity
    #[inline]
    pub const fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FlightId {
    fn from(raw: u64) -> Self {
        FlightId(raw)
    }
}

/// A scheduled flight
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flight {
    /// Stable identity
    pub id: FlightId,
    /// Origin airport or city
    pub from: String,
    /// Destination airport or city
    pub to: String,
    /// Scheduled departure (UTC)
    pub date: DateTime<Utc>,
    /// Whether the flight is reported as delayed
    pub delayed: bool,
}

impl Flight {
    /// Create a flight record
    pub fn new(
        id: u64,
        from: impl Into<String>,
        to: impl Into<String>,
        date: DateTime<Utc>,
        delayed: bool,
    ) -> Self {
        Self {
            id: FlightId(id),
            from: from.into(),
            to: to.into(),
            date,
            delayed,
        }
    }

    /// Empty record served when no active flight is cached
    ///
    /// Uses the Unix epoch as its date so repeated calls compare equal.
    pub fn placeholder() -> Self {
        Self {
            id: FlightId::UNSET,
            from: String::new(),
            to: String::new(),
            date: DateTime::<Utc>::default(),
            delayed: false,
        }
    }

    /// Whether this is the placeholder record
    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }

    /// New record with the departure moved by `by` and marked delayed
    pub fn with_delay(&self, by: Duration) -> Self {
        Self {
            date: self.date + by,
            delayed: true,
            ..self.clone()
        }
    }
}
