//! Transport contract consumed by the store
//!
//! The store never talks to a network itself. Everything remote goes through
//! a `FlightTransport`: a filtered search, a keyed lookup, and a save that
//! returns the canonical persisted record.
//!
//! `InMemoryTransport` is a table-backed implementation for tests and
//! embedding. It supports artificial latency and injected failures.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use skybook_core::{Flight, FlightFilter, FlightId, TransportError, TransportResult};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Remote source of flights
///
/// Thread safety: implementations are shared between the store's tasks and
/// must be safe to call concurrently.
#[async_trait]
pub trait FlightTransport: Send + Sync + 'static {
    /// Flights whose origin and destination start with the given prefixes
    async fn find(&self, from: &str, to: &str, urgent: bool) -> TransportResult<Vec<Flight>>;

    /// Flight with the given identity
    async fn find_by_id(&self, id: FlightId) -> TransportResult<Flight>;

    /// Persist `flight` and return the record as stored remotely
    async fn save(&self, flight: Flight) -> TransportResult<Flight>;
}

/// Call counters of an `InMemoryTransport`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// `find` calls
    pub finds: u64,
    /// `find_by_id` calls
    pub lookups: u64,
    /// `save` calls
    pub saves: u64,
}

/// Table-backed transport
///
/// Saves assign a fresh identity to records with the unset identity and
/// trim surrounding whitespace from origin and destination, so the returned
/// record can differ from the submitted one the way a real server's can.
/// The urgency flag is accepted but not modelled by the table.
pub struct InMemoryTransport {
    flights: RwLock<BTreeMap<FlightId, Flight>>,
    next_id: AtomicU64,
    latency: Duration,
    failures: Mutex<VecDeque<TransportError>>,
    finds: AtomicU64,
    lookups: AtomicU64,
    saves: AtomicU64,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// Empty table, no latency
    pub fn new() -> Self {
        Self {
            flights: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            latency: Duration::ZERO,
            failures: Mutex::new(VecDeque::new()),
            finds: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            saves: AtomicU64::new(0),
        }
    }

    /// Table pre-populated with `flights`
    pub fn with_flights(flights: impl IntoIterator<Item = Flight>) -> Self {
        let transport = Self::new();
        transport.seed(flights);
        transport
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Insert or overwrite rows directly, bypassing `save`
    pub fn seed(&self, flights: impl IntoIterator<Item = Flight>) {
        let mut table = self.flights.write();
        for flight in flights {
            self.next_id
                .fetch_max(flight.id.as_u64() + 1, Ordering::SeqCst);
            table.insert(flight.id, flight);
        }
    }

    /// Make the next call fail with `error`
    ///
    /// Queued failures are consumed one per call, in order.
    pub fn fail_next(&self, error: TransportError) {
        self.failures.lock().push_back(error);
    }

    /// Row currently stored for `id`
    pub fn stored(&self, id: FlightId) -> Option<Flight> {
        self.flights.read().get(&id).cloned()
    }

    /// Call counters
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            finds: self.finds.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            saves: self.saves.load(Ordering::Relaxed),
        }
    }

    async fn round_trip(&self) -> TransportResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn canonicalize(&self, flight: Flight) -> Flight {
        let id = if flight.id.is_unset() {
            FlightId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
        } else {
            flight.id
        };
        Flight {
            id,
            from: flight.from.trim().to_string(),
            to: flight.to.trim().to_string(),
            ..flight
        }
    }
}

#[async_trait]
impl FlightTransport for InMemoryTransport {
    async fn find(&self, from: &str, to: &str, urgent: bool) -> TransportResult<Vec<Flight>> {
        self.finds.fetch_add(1, Ordering::Relaxed);
        self.round_trip().await?;

        let filter = FlightFilter::new(from, to, urgent);
        Ok(self
            .flights
            .read()
            .values()
            .filter(|flight| filter.matches(flight))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: FlightId) -> TransportResult<Flight> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.round_trip().await?;
        self.stored(id).ok_or(TransportError::NotFound(id))
    }

    async fn save(&self, flight: Flight) -> TransportResult<Flight> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.round_trip().await?;

        let stored = self.canonicalize(flight);
        self.flights.write().insert(stored.id, stored.clone());
        Ok(stored)
    }
}
