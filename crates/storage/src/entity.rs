//! Identity abstraction for cached values

use skybook_core::{Flight, FlightId};
use std::fmt::Debug;
use std::hash::Hash;

/// A value the cache can key by identity
///
/// Equality is used to detect no-op overwrites, so it must compare the
/// whole value, not just the identity.
pub trait Entity: Clone + PartialEq {
    /// Identity type
    type Id: Copy + Eq + Hash + Debug;

    /// Identity of this value
    fn entity_id(&self) -> Self::Id;
}

impl Entity for Flight {
    type Id = FlightId;

    #[inline]
    fn entity_id(&self) -> FlightId {
        self.id
    }
}
