//! Identity-keyed entity cache
//!
//! # Design
//!
//! - FxHashMap: O(1) lookups by identity, fast non-crypto hash
//! - Identity index: `Vec<Id>` in first-insertion order, so snapshots are
//!   deterministic (consumers still must not treat it as display order)
//!
//! # Operations
//!
//! | operation | effect on entries outside the input |
//! |-----------|-------------------------------------|
//! | `replace_all` | removed |
//! | `merge_upsert` | untouched |
//! | `upsert_one` | untouched |
//! | `clear` | removed |
//!
//! Every mutation returns a [`CacheDelta`]. An overwrite with an equal value
//! counts as `unchanged`, so `delta.changed()` is false for idempotent writes.

use crate::entity::Entity;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Outcome of a cache mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheDelta {
    /// Identities that were not cached before
    pub inserted: usize,
    /// Identities whose value was replaced by a different value
    pub updated: usize,
    /// Identities written with a value equal to the cached one
    pub unchanged: usize,
    /// Identities dropped from the cache
    pub removed: usize,
}

impl CacheDelta {
    /// Whether the cache content differs from before the operation
    #[inline]
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.removed > 0
    }
}

/// Identity-keyed cache of immutable values
///
/// Never holds two entries with the same identity.
#[derive(Debug, Clone)]
pub struct EntityCache<E: Entity> {
    /// Identities in first-insertion order
    ids: Vec<E::Id>,
    /// Values by identity
    entities: FxHashMap<E::Id, E>,
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityCache<E> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            entities: FxHashMap::default(),
        }
    }

    /// Create a cache pre-populated with `records` (later duplicates win)
    pub fn from_records(records: impl IntoIterator<Item = E>) -> Self {
        let mut cache = Self::new();
        cache.merge_upsert(records);
        cache
    }

    // ========== Mutations ==========

    /// Discard every entry and install exactly `records`
    ///
    /// If an identity occurs more than once in `records`, the last value wins.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = E>) -> CacheDelta {
        let mut ids = Vec::new();
        let mut entities = FxHashMap::default();
        for record in records {
            let id = record.entity_id();
            if entities.insert(id, record).is_none() {
                ids.push(id);
            }
        }

        let mut delta = CacheDelta::default();
        for (id, record) in &entities {
            match self.entities.get(id) {
                Some(existing) if existing == record => delta.unchanged += 1,
                Some(_) => delta.updated += 1,
                None => delta.inserted += 1,
            }
        }
        delta.removed = self
            .ids
            .iter()
            .filter(|id| !entities.contains_key(*id))
            .count();

        self.ids = ids;
        self.entities = entities;
        trace!(target: "skybook::cache", ?delta, len = self.ids.len(), "replace_all");
        delta
    }

    /// Insert unseen identities and overwrite cached ones
    ///
    /// Entries whose identity is not in `records` are left untouched.
    pub fn merge_upsert(&mut self, records: impl IntoIterator<Item = E>) -> CacheDelta {
        let mut delta = CacheDelta::default();
        for record in records {
            self.apply_upsert(record, &mut delta);
        }
        trace!(target: "skybook::cache", ?delta, len = self.ids.len(), "merge_upsert");
        delta
    }

    /// Single-record form of [`merge_upsert`](Self::merge_upsert)
    pub fn upsert_one(&mut self, record: E) -> CacheDelta {
        let mut delta = CacheDelta::default();
        self.apply_upsert(record, &mut delta);
        delta
    }

    /// Remove every entry; clearing an empty cache is a no-op
    pub fn clear(&mut self) -> CacheDelta {
        let delta = CacheDelta {
            removed: self.ids.len(),
            ..CacheDelta::default()
        };
        self.ids.clear();
        self.entities.clear();
        delta
    }

    fn apply_upsert(&mut self, record: E, delta: &mut CacheDelta) {
        let id = record.entity_id();
        match self.entities.get_mut(&id) {
            Some(existing) if *existing == record => delta.unchanged += 1,
            Some(existing) => {
                *existing = record;
                delta.updated += 1;
            }
            None => {
                self.ids.push(id);
                self.entities.insert(id, record);
                delta.inserted += 1;
            }
        }
    }

    // ========== Reads ==========

    /// Snapshot of every cached value
    pub fn get_all(&self) -> Vec<E> {
        self.iter().cloned().collect()
    }

    /// Iterate cached values in identity-index order
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.ids.iter().filter_map(move |id| self.entities.get(id))
    }

    /// Cached value for `id`
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.entities.get(id)
    }

    /// Whether `id` is cached
    pub fn contains(&self, id: &E::Id) -> bool {
        self.entities.contains_key(id)
    }

    /// Cached identities in identity-index order
    pub fn ids(&self) -> &[E::Id] {
        &self.ids
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<E: Entity> PartialEq for EntityCache<E> {
    /// Content equality; the identity index order is not compared
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
    }
}
