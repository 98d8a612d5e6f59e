//! Selection set ("basket") keyed by flight identity
//!
//! The basket is independent of the entity cache: it may mark identities that
//! are not cached, and cache updates never touch it.

use crate::flight::FlightId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity to membership mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Basket(BTreeMap<FlightId, bool>);

impl Basket {
    /// Create an empty basket
    pub fn new() -> Self {
        Self::default()
    }

    /// Set membership for one identity
    ///
    /// Returns `true` if the stored value changed. Deselecting keeps an
    /// explicit `false` entry, the way a toggled checkbox does.
    pub fn set(&mut self, id: FlightId, selected: bool) -> bool {
        self.0.insert(id, selected) != Some(selected)
    }

    /// Whether the identity is selected
    pub fn is_selected(&self, id: FlightId) -> bool {
        self.0.get(&id).copied().unwrap_or(false)
    }

    /// Number of identities with an explicit entry
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no identity has an entry
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
