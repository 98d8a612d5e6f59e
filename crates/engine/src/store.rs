//! Booking store facade
//!
//! `BookingStore` owns the state, the derived views and the three request
//! pipelines (search, active-record hydration, saves). It is constructed
//! explicitly with its transport and configuration and must be created inside
//! a tokio runtime, which drives its background tasks.
//!
//! ## Reads
//!
//! Every read runs under one state read lock and returns an owned snapshot or
//! an `Arc` view, so no caller can observe half of an update.
//!
//! ## Writes
//!
//! Local updaters (`set_*`, `reset_flights`, `delay_flight`) commit in one
//! write critical section. Remote effects (`search`, `load_flights`,
//! `save_flight`, active-record hydration) commit when their call resolves,
//! and only if they are still current.
//!
//! ## Shutdown
//!
//! `shutdown` (also run on drop) cancels all background work. Nothing is
//! applied afterwards; local updaters become no-ops.

use crate::config::StoreConfig;
use crate::loader::ActiveLoader;
use crate::search::{SearchController, SearchGate};
use crate::shared::{StoreChange, StoreShared};
use crate::state::{LoadStatus, SaveStatus, SearchStatus, SliceVersions, StoreState};
use crate::transport::FlightTransport;
use crate::update::UpdateController;
use crate::views::ViewKind;
use skybook_core::{Basket, Flight, FlightFilter, FlightId, StoreError, StoreResult};
use skybook_storage::CacheDelta;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

/// Reactive client-side store for flights
pub struct BookingStore {
    shared: Arc<StoreShared>,
    search: SearchController,
    updates: UpdateController,
    loader: ActiveLoader,
    config: StoreConfig,
}

impl BookingStore {
    /// Create a store on the current tokio runtime
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidConfig` if `config` fails validation
    /// - `StoreError::NoRuntime` if called outside a tokio runtime
    pub fn new(transport: Arc<dyn FlightTransport>, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|e| StoreError::NoRuntime(e.to_string()))?;

        let shared = Arc::new(StoreShared::new(config.initial_filter.clone()));
        let search = SearchController::spawn(
            Arc::clone(&shared),
            Arc::clone(&transport),
            &config,
            &handle,
        );
        let updates = UpdateController::new(Arc::clone(&shared), Arc::clone(&transport));
        let loader = ActiveLoader::new(Arc::clone(&shared), transport, &handle);

        info!(
            target: "skybook::store",
            debounce_ms = config.debounce_ms,
            min_query_len = config.min_query_len,
            from = %config.initial_filter.from,
            to = %config.initial_filter.to,
            "booking store started"
        );

        if config.load_on_start {
            search.load_in_background(config.initial_filter.clone());
        }

        Ok(Self {
            shared,
            search,
            updates,
            loader,
            config,
        })
    }

    /// Create a store with the default configuration
    pub fn with_defaults(transport: Arc<dyn FlightTransport>) -> StoreResult<Self> {
        Self::new(transport, StoreConfig::default())
    }

    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        self.shared.read(f)
    }

    /// Run a local write unless the store is shut down
    fn write<R: Default>(&self, op: &'static str, f: impl FnOnce(&mut StoreState) -> R) -> R {
        self.shared.update(|state| {
            if state.is_closed() {
                debug!(target: "skybook::store", op, "ignored after shutdown");
                return R::default();
            }
            f(state)
        })
    }

    // ========== State reads ==========

    /// Configuration the store was created with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Search input gate
    pub fn search_gate(&self) -> SearchGate {
        self.search.gate()
    }

    /// Current filter
    pub fn filter(&self) -> FlightFilter {
        self.read(|state| state.filter().clone())
    }

    /// Selection set
    pub fn basket(&self) -> Basket {
        self.read(|state| state.basket().clone())
    }

    /// Active-identity pointer
    pub fn active_id(&self) -> Option<FlightId> {
        self.read(StoreState::active_id)
    }

    /// Snapshot of every cached flight
    pub fn flights(&self) -> Vec<Flight> {
        self.read(|state| state.flights().get_all())
    }

    /// Cached flight with identity `id`
    pub fn flight(&self, id: FlightId) -> Option<Flight> {
        self.read(|state| state.flights().get(&id).cloned())
    }

    /// Search stream bookkeeping
    pub fn search_status(&self) -> SearchStatus {
        self.read(|state| state.search().clone())
    }

    /// Hydration bookkeeping
    pub fn load_status(&self) -> LoadStatus {
        self.read(|state| state.load().clone())
    }

    /// Save bookkeeping
    pub fn save_status(&self) -> SaveStatus {
        self.read(|state| state.saves().clone())
    }

    /// Whether a save for `id` awaits acknowledgment
    pub fn is_saving(&self, id: FlightId) -> bool {
        self.updates.is_saving(id)
    }

    /// Slice version table
    pub fn versions(&self) -> SliceVersions {
        self.read(|state| *state.versions())
    }

    /// Number of notified state changes
    pub fn revision(&self) -> u64 {
        self.read(StoreState::revision)
    }

    // ========== Derived views ==========

    /// Cached flights matching the current filter
    pub fn filtered_flights(&self) -> Arc<Vec<Flight>> {
        self.read(|state| self.shared.views().filtered_flights(state))
    }

    /// Cached flights selected in the basket
    pub fn selected_flights(&self) -> Arc<Vec<Flight>> {
        self.read(|state| self.shared.views().selected_flights(state))
    }

    /// Cached flights flagged as delayed
    pub fn delayed_flights(&self) -> Arc<Vec<Flight>> {
        self.read(|state| self.shared.views().delayed_flights(state))
    }

    /// Cached flight under the pointer, or the placeholder
    pub fn active_flight(&self) -> Arc<Flight> {
        self.read(|state| self.shared.views().active_flight(state))
    }

    /// Route text for the current filter
    pub fn route_description(&self) -> Arc<String> {
        self.read(|state| self.shared.views().route_description(state))
    }

    /// How often a view has been recomputed
    pub fn view_recomputations(&self, kind: ViewKind) -> u64 {
        self.shared.views().recomputations(kind)
    }

    // ========== Local updaters ==========

    /// Replace the filter and feed it into the search stream
    ///
    /// Returns whether the filter changed. An unchanged filter starts no search.
    pub fn set_filter(&self, filter: FlightFilter) -> bool {
        let changed = self.write("set_filter", |state| state.set_filter(filter.clone()));
        if changed {
            self.search.submit(filter);
        }
        changed
    }

    /// Merge `flights` into the cache
    pub fn set_flights(&self, flights: Vec<Flight>) -> CacheDelta {
        self.write("set_flights", |state| state.merge_flights(flights))
    }

    /// Replace the cache content with exactly `flights`
    pub fn replace_flights(&self, flights: Vec<Flight>) -> CacheDelta {
        self.write("replace_flights", |state| state.replace_flights(flights))
    }

    /// Upsert one flight
    pub fn set_flight(&self, flight: Flight) -> CacheDelta {
        self.write("set_flight", |state| state.upsert_flight(flight))
    }

    /// Empty the cache; basket and pointer are kept
    pub fn reset_flights(&self) -> CacheDelta {
        self.write("reset_flights", StoreState::clear_flights)
    }

    /// Set basket membership of one identity; returns whether it changed
    pub fn set_basket_id(&self, id: FlightId, selected: bool) -> bool {
        self.write("set_basket_id", |state| state.set_basket_id(id, selected))
    }

    /// Move the active-identity pointer and hydrate the new record
    ///
    /// Returns whether the pointer changed. A pointer to the unset identity
    /// is never fetched.
    pub fn set_active_id(&self, id: Option<FlightId>) -> bool {
        self.loader.select(id)
    }

    /// Postpone a cached flight by `by` and flag it delayed
    ///
    /// Local edit only; returns the new record, or `None` if `id` is not cached.
    pub fn delay_flight(&self, id: FlightId, by: chrono::Duration) -> Option<Flight> {
        self.write("delay_flight", |state| {
            let delayed = state.flights().get(&id)?.with_delay(by);
            state.upsert_flight(delayed.clone());
            Some(delayed)
        })
    }

    // ========== Remote effects ==========

    /// Feed a filter into the debounced search stream
    ///
    /// Returns whether the input passed the gate. The store filter is not
    /// changed.
    pub fn search(&self, filter: FlightFilter) -> bool {
        self.search.submit(filter)
    }

    /// Feed origin text into the search stream
    ///
    /// The text is combined with the current filter's destination and urgency.
    pub fn search_text(&self, origin: &str) -> bool {
        let filter = self.read(|state| state.filter().with_origin(origin));
        self.search.submit(filter)
    }

    /// Load flights for `filter` right away, bypassing the debouncer
    ///
    /// Returns the number of records received. Skipped (`Ok(0)`) unless both
    /// origin and destination are set. A transport failure is recorded in the
    /// search status and also yields `Ok(0)`.
    ///
    /// # Errors
    ///
    /// - `StoreError::Superseded` if a newer search was issued meanwhile
    /// - `StoreError::Closed` if the store is shut down
    pub async fn load_flights(&self, filter: FlightFilter) -> StoreResult<usize> {
        self.search.load_now(filter).await
    }

    /// Save `flight` remotely and cache the record the remote source returns
    ///
    /// The cache is not touched before acknowledgment.
    ///
    /// # Errors
    ///
    /// - `StoreError::Transport` if the save failed; the cache is unchanged
    /// - `StoreError::Closed` if the store is shut down
    pub async fn save_flight(&self, flight: Flight) -> StoreResult<Flight> {
        self.updates.save(flight).await
    }

    // ========== Lifecycle ==========

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> watch::Receiver<StoreChange> {
        self.shared.subscribe()
    }

    /// Wait until no input is debouncing and no search, lookup or save is in
    /// flight; returns immediately after shutdown
    pub async fn idle(&self) {
        self.shared.idle().await
    }

    /// Cancel background work and stop applying results; idempotent
    pub fn shutdown(&self) {
        if self.shared.close() {
            info!(target: "skybook::store", "booking store shut down");
        }
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for BookingStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BookingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingStore")
            .field("revision", &self.revision())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}
