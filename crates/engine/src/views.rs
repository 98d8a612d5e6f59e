//! Derived views over the store state
//!
//! Each view is a pure function of a declared set of state slices. A view
//! remembers the slice versions it last read and recomputes only when one of
//! them moved. When a recomputation yields a value equal to the previous one,
//! the previous `Arc` is handed out again, so consumers comparing with
//! `Arc::ptr_eq` see a stable result.
//!
//! ## Dependency table
//!
//! | view | slices |
//! |------|--------|
//! | `FilteredFlights` | Entities, Filter |
//! | `SelectedFlights` | Entities, Basket |
//! | `DelayedFlights` | Entities |
//! | `ActiveFlight` | Entities, ActiveId |
//! | `RouteDescription` | Filter |
//!
//! Views are evaluated while the caller holds the state read lock, so a view
//! never mixes slices from two different updates.

use crate::state::{Slice, StoreState};
use parking_lot::Mutex;
use skybook_core::Flight;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Identifies a derived view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Cached flights matching the filter's prefixes
    FilteredFlights,
    /// Cached flights selected in the basket
    SelectedFlights,
    /// Cached flights flagged as delayed
    DelayedFlights,
    /// Cached flight under the active-identity pointer, or the placeholder
    ActiveFlight,
    /// Route text built from the filter
    RouteDescription,
}

impl ViewKind {
    /// Every view
    pub const ALL: [ViewKind; 5] = [
        ViewKind::FilteredFlights,
        ViewKind::SelectedFlights,
        ViewKind::DelayedFlights,
        ViewKind::ActiveFlight,
        ViewKind::RouteDescription,
    ];

    /// Slices this view reads
    pub const fn dependencies(&self) -> &'static [Slice] {
        match self {
            ViewKind::FilteredFlights => &[Slice::Entities, Slice::Filter],
            ViewKind::SelectedFlights => &[Slice::Entities, Slice::Basket],
            ViewKind::DelayedFlights => &[Slice::Entities],
            ViewKind::ActiveFlight => &[Slice::Entities, Slice::ActiveId],
            ViewKind::RouteDescription => &[Slice::Filter],
        }
    }

    /// Whether a change to any of `slices` can change this view
    pub fn is_affected_by(&self, slices: &[Slice]) -> bool {
        self.dependencies().iter().any(|dep| slices.contains(dep))
    }

    /// Short name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            ViewKind::FilteredFlights => "filtered_flights",
            ViewKind::SelectedFlights => "selected_flights",
            ViewKind::DelayedFlights => "delayed_flights",
            ViewKind::ActiveFlight => "active_flight",
            ViewKind::RouteDescription => "route_description",
        }
    }
}

struct Memo<T> {
    seen: SmallVec<[u64; 4]>,
    value: Arc<T>,
}

/// Memoized, dependency-tracked computation over `StoreState`
pub struct Computed<T> {
    kind: ViewKind,
    compute: fn(&StoreState) -> T,
    memo: Mutex<Option<Memo<T>>>,
    recomputations: AtomicU64,
}

impl<T: PartialEq> Computed<T> {
    /// Create a view that evaluates `compute` on demand
    pub fn new(kind: ViewKind, compute: fn(&StoreState) -> T) -> Self {
        Self {
            kind,
            compute,
            memo: Mutex::new(None),
            recomputations: AtomicU64::new(0),
        }
    }

    /// Current value of the view for `state`
    pub fn get(&self, state: &StoreState) -> Arc<T> {
        let seen: SmallVec<[u64; 4]> = self
            .kind
            .dependencies()
            .iter()
            .map(|slice| state.versions().get(*slice))
            .collect();

        let mut memo = self.memo.lock();
        if let Some(current) = memo.as_ref() {
            if current.seen == seen {
                return Arc::clone(&current.value);
            }
        }

        let fresh = (self.compute)(state);
        self.recomputations.fetch_add(1, Ordering::Relaxed);

        let value = match memo.take() {
            Some(previous) if *previous.value == fresh => previous.value,
            _ => Arc::new(fresh),
        };
        trace!(target: "skybook::views", view = self.kind.name(), "recomputed");
        *memo = Some(Memo {
            seen,
            value: Arc::clone(&value),
        });
        value
    }

    /// How many times the value was recomputed
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }
}

fn filtered_flights(state: &StoreState) -> Vec<Flight> {
    let filter = state.filter();
    state
        .flights()
        .iter()
        .filter(|flight| filter.matches(flight))
        .cloned()
        .collect()
}

fn selected_flights(state: &StoreState) -> Vec<Flight> {
    let basket = state.basket();
    state
        .flights()
        .iter()
        .filter(|flight| basket.is_selected(flight.id))
        .cloned()
        .collect()
}

fn delayed_flights(state: &StoreState) -> Vec<Flight> {
    state
        .flights()
        .iter()
        .filter(|flight| flight.delayed)
        .cloned()
        .collect()
}

fn active_flight(state: &StoreState) -> Flight {
    state
        .active_id()
        .and_then(|id| state.flights().get(&id))
        .cloned()
        .unwrap_or_else(Flight::placeholder)
}

fn route_description(state: &StoreState) -> String {
    state.filter().route_description()
}

/// All derived views of the booking store
pub struct ViewEngine {
    filtered: Computed<Vec<Flight>>,
    selected: Computed<Vec<Flight>>,
    delayed: Computed<Vec<Flight>>,
    active: Computed<Flight>,
    route: Computed<String>,
}

impl Default for ViewEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewEngine {
    /// Create the view set; nothing is computed until first read
    pub fn new() -> Self {
        Self {
            filtered: Computed::new(ViewKind::FilteredFlights, filtered_flights),
            selected: Computed::new(ViewKind::SelectedFlights, selected_flights),
            delayed: Computed::new(ViewKind::DelayedFlights, delayed_flights),
            active: Computed::new(ViewKind::ActiveFlight, active_flight),
            route: Computed::new(ViewKind::RouteDescription, route_description),
        }
    }

    /// Cached flights matching the filter
    pub fn filtered_flights(&self, state: &StoreState) -> Arc<Vec<Flight>> {
        self.filtered.get(state)
    }

    /// Cached flights selected in the basket
    pub fn selected_flights(&self, state: &StoreState) -> Arc<Vec<Flight>> {
        self.selected.get(state)
    }

    /// Cached flights flagged as delayed
    pub fn delayed_flights(&self, state: &StoreState) -> Arc<Vec<Flight>> {
        self.delayed.get(state)
    }

    /// Active flight or the placeholder
    pub fn active_flight(&self, state: &StoreState) -> Arc<Flight> {
        self.active.get(state)
    }

    /// Route text for the current filter
    pub fn route_description(&self, state: &StoreState) -> Arc<String> {
        self.route.get(state)
    }

    /// Recomputation count of one view
    pub fn recomputations(&self, kind: ViewKind) -> u64 {
        match kind {
            ViewKind::FilteredFlights => self.filtered.recomputations(),
            ViewKind::SelectedFlights => self.selected.recomputations(),
            ViewKind::DelayedFlights => self.delayed.recomputations(),
            ViewKind::ActiveFlight => self.active.recomputations(),
            ViewKind::RouteDescription => self.route.recomputations(),
        }
    }
}
