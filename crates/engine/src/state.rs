//! Store state and its versioned slices
//!
//! `StoreState` is the single owner of everything the store knows:
//! filter, basket, active-identity pointer, entity cache, and the request
//! bookkeeping of the search, lookup and save pipelines.
//!
//! ## Slices
//!
//! State is partitioned into slices, each with its own version counter.
//! A slice version is bumped only when the slice's value actually changes,
//! which is what lets derived views skip recomputation:
//!
//! | slice | bumped by |
//! |-------|-----------|
//! | `Filter` | `set_filter` with a different filter |
//! | `Basket` | `set_basket_id` that changes membership |
//! | `ActiveId` | `set_active_id` with a different pointer |
//! | `Entities` | any cache write whose `CacheDelta` reports a change |
//! | `Requests` | any change to search/lookup/save bookkeeping |
//!
//! Fields are private; every mutation goes through a method that maintains
//! the version table.

use skybook_core::{Basket, Flight, FlightFilter, FlightId};
use skybook_storage::{CacheDelta, EntityCache};
use smallvec::SmallVec;

/// Independently versioned part of the store state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    /// Current search filter
    Filter,
    /// Selection set
    Basket,
    /// Active-identity pointer
    ActiveId,
    /// Entity cache content
    Entities,
    /// Search, lookup and save bookkeeping
    Requests,
}

impl Slice {
    /// Every slice, in table order
    pub const ALL: [Slice; 5] = [
        Slice::Filter,
        Slice::Basket,
        Slice::ActiveId,
        Slice::Entities,
        Slice::Requests,
    ];
}

/// Version counter per slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceVersions {
    filter: u64,
    basket: u64,
    active_id: u64,
    entities: u64,
    requests: u64,
}

impl SliceVersions {
    /// Current version of `slice`
    #[inline]
    pub fn get(&self, slice: Slice) -> u64 {
        match slice {
            Slice::Filter => self.filter,
            Slice::Basket => self.basket,
            Slice::ActiveId => self.active_id,
            Slice::Entities => self.entities,
            Slice::Requests => self.requests,
        }
    }

    fn bump(&mut self, slice: Slice) {
        let counter = match slice {
            Slice::Filter => &mut self.filter,
            Slice::Basket => &mut self.basket,
            Slice::ActiveId => &mut self.active_id,
            Slice::Entities => &mut self.entities,
            Slice::Requests => &mut self.requests,
        };
        *counter += 1;
    }

    /// Slices whose version differs from `earlier`
    pub fn changed_since(&self, earlier: &SliceVersions) -> SmallVec<[Slice; 5]> {
        Slice::ALL
            .into_iter()
            .filter(|slice| self.get(*slice) != earlier.get(*slice))
            .collect()
    }
}

/// Search stream stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPhase {
    /// Nothing pending, last request (if any) succeeded
    #[default]
    Idle,
    /// An accepted input is waiting for the quiet window to elapse
    Debouncing,
    /// A request is in flight
    InFlight,
    /// Last request failed; its result was applied as empty
    Failed,
}

/// Bookkeeping of the search stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStatus {
    /// Current stage
    pub phase: SearchPhase,
    /// A request of the current generation is unresolved
    pub loading: bool,
    /// An input is waiting in the debouncer
    pub pending: bool,
    /// Generation of the most recently issued request
    pub generation: u64,
    /// Filter carried by the most recently issued request
    pub last_query: Option<FlightFilter>,
    /// Diagnostic of the last failed request
    pub last_error: Option<String>,
    /// Records returned by the last applied request
    pub last_hits: usize,
}

/// Bookkeeping of active-record hydration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    /// A lookup of the current generation is unresolved
    pub in_flight: bool,
    /// Generation of the most recent pointer change
    pub generation: u64,
    /// Diagnostic of the last failed lookup
    pub last_error: Option<String>,
}

/// Bookkeeping of saves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    /// Saves awaiting acknowledgment
    pub pending: usize,
    /// Saves acknowledged by the remote source
    pub completed: u64,
    /// Saves that failed
    pub failed: u64,
    /// Diagnostic of the last failed save
    pub last_error: Option<String>,
}

/// Aggregate store state
#[derive(Debug, Clone)]
pub struct StoreState {
    filter: FlightFilter,
    basket: Basket,
    active_id: Option<FlightId>,
    flights: EntityCache<Flight>,
    search: SearchStatus,
    load: LoadStatus,
    saves: SaveStatus,
    versions: SliceVersions,
    revision: u64,
    closed: bool,
}

impl StoreState {
    /// Fresh state: given filter, empty basket and cache, no active identity
    pub fn new(initial_filter: FlightFilter) -> Self {
        Self {
            filter: initial_filter,
            basket: Basket::new(),
            active_id: None,
            flights: EntityCache::new(),
            search: SearchStatus::default(),
            load: LoadStatus::default(),
            saves: SaveStatus::default(),
            versions: SliceVersions::default(),
            revision: 0,
            closed: false,
        }
    }

    // ========== Reads ==========

    /// Current filter
    pub fn filter(&self) -> &FlightFilter {
        &self.filter
    }

    /// Selection set
    pub fn basket(&self) -> &Basket {
        &self.basket
    }

    /// Active-identity pointer
    pub fn active_id(&self) -> Option<FlightId> {
        self.active_id
    }

    /// Entity cache
    pub fn flights(&self) -> &EntityCache<Flight> {
        &self.flights
    }

    /// Search stream bookkeeping
    pub fn search(&self) -> &SearchStatus {
        &self.search
    }

    /// Active-record hydration bookkeeping
    pub fn load(&self) -> &LoadStatus {
        &self.load
    }

    /// Save bookkeeping
    pub fn saves(&self) -> &SaveStatus {
        &self.saves
    }

    /// Slice version table
    pub fn versions(&self) -> &SliceVersions {
        &self.versions
    }

    /// Number of notified state changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the store has been shut down
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// No input debouncing, no search, lookup or save unresolved
    pub fn is_quiescent(&self) -> bool {
        !self.search.pending && !self.search.loading && !self.load.in_flight && self.saves.pending == 0
    }

    // ========== Slice mutations ==========

    /// Replace the filter; returns whether it changed
    pub(crate) fn set_filter(&mut self, filter: FlightFilter) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter;
        self.versions.bump(Slice::Filter);
        true
    }

    /// Set basket membership for one identity; returns whether it changed
    pub(crate) fn set_basket_id(&mut self, id: FlightId, selected: bool) -> bool {
        let changed = self.basket.set(id, selected);
        if changed {
            self.versions.bump(Slice::Basket);
        }
        changed
    }

    /// Move the active-identity pointer; returns whether it changed
    pub(crate) fn set_active_id(&mut self, id: Option<FlightId>) -> bool {
        if self.active_id == id {
            return false;
        }
        self.active_id = id;
        self.versions.bump(Slice::ActiveId);
        true
    }

    pub(crate) fn merge_flights(&mut self, flights: impl IntoIterator<Item = Flight>) -> CacheDelta {
        let delta = self.flights.merge_upsert(flights);
        self.track_entities(delta)
    }

    pub(crate) fn upsert_flight(&mut self, flight: Flight) -> CacheDelta {
        let delta = self.flights.upsert_one(flight);
        self.track_entities(delta)
    }

    pub(crate) fn replace_flights(&mut self, flights: impl IntoIterator<Item = Flight>) -> CacheDelta {
        let delta = self.flights.replace_all(flights);
        self.track_entities(delta)
    }

    pub(crate) fn clear_flights(&mut self) -> CacheDelta {
        let delta = self.flights.clear();
        self.track_entities(delta)
    }

    fn track_entities(&mut self, delta: CacheDelta) -> CacheDelta {
        if delta.changed() {
            self.versions.bump(Slice::Entities);
        }
        delta
    }

    // ========== Bookkeeping ==========

    pub(crate) fn search_mut(&mut self) -> &mut SearchStatus {
        self.versions.bump(Slice::Requests);
        &mut self.search
    }

    pub(crate) fn load_mut(&mut self) -> &mut LoadStatus {
        self.versions.bump(Slice::Requests);
        &mut self.load
    }

    pub(crate) fn saves_mut(&mut self) -> &mut SaveStatus {
        self.versions.bump(Slice::Requests);
        &mut self.saves
    }

    pub(crate) fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Mark the store closed; returns whether it was open
    pub(crate) fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.versions.bump(Slice::Requests);
        true
    }
}
