//! Search controller
//!
//! Turns a stream of search inputs into at most one applied result per
//! accepted input:
//!
//! 1. **Gate**: inputs failing [`SearchGate`] are dropped before they can
//!    touch the debounce timer.
//! 2. **Debounce**: a driver task holds the latest input until the quiet
//!    window elapses with no newer input. Newer input restarts the window.
//! 3. **Duplicate suppression**: an input equal to the previously accepted
//!    one is dropped without a request.
//! 4. **Issuance**: each accepted input bumps the stream generation and
//!    issues one `find` call.
//! 5. **Resolution**: a result is merged only if its generation is still
//!    current when it arrives. The check runs under the state write lock.
//!
//! Transport calls are never aborted. A stale result is discarded on arrival.

use crate::config::StoreConfig;
use crate::shared::StoreShared;
use crate::state::{SearchPhase, StoreState};
use crate::transport::FlightTransport;
use skybook_core::{FlightFilter, StoreError, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

/// Validity gate applied to search inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchGate {
    /// Minimum number of characters in the origin
    pub min_origin_len: usize,
    /// Reject inputs with an empty destination
    pub require_destination: bool,
}

impl Default for SearchGate {
    fn default() -> Self {
        Self {
            min_origin_len: crate::config::DEFAULT_MIN_QUERY_LEN,
            require_destination: false,
        }
    }
}

impl SearchGate {
    /// Whether `filter` may enter the debouncer
    pub fn accepts(&self, filter: &FlightFilter) -> bool {
        filter.from.chars().count() >= self.min_origin_len
            && (!self.require_destination || !filter.to.is_empty())
    }
}

/// Input as seen by the driver, tagged with its submission sequence
struct Input {
    filter: FlightFilter,
    seq: u64,
}

/// Front half of the search stream, owned by the store
pub(crate) struct SearchController {
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    gate: SearchGate,
    inputs: mpsc::UnboundedSender<Input>,
    submitted: Arc<AtomicU64>,
    handle: Handle,
}

impl SearchController {
    /// Create the controller and start its driver task on `handle`
    pub(crate) fn spawn(
        shared: Arc<StoreShared>,
        transport: Arc<dyn FlightTransport>,
        config: &StoreConfig,
        handle: &Handle,
    ) -> Self {
        let (inputs, receiver) = mpsc::unbounded_channel();
        let submitted = Arc::new(AtomicU64::new(0));

        let driver = Driver {
            shared: Arc::clone(&shared),
            transport: Arc::clone(&transport),
            inputs: receiver,
            submitted: Arc::clone(&submitted),
            quiet_window: config.quiet_window(),
            last_accepted: None,
        };
        handle.spawn(driver.run());

        Self {
            shared,
            transport,
            gate: config.gate(),
            inputs,
            submitted,
            handle: handle.clone(),
        }
    }

    pub(crate) fn gate(&self) -> SearchGate {
        self.gate
    }

    /// Feed one input into the stream; returns whether it passed the gate
    pub(crate) fn submit(&self, filter: FlightFilter) -> bool {
        if !self.gate.accepts(&filter) {
            trace!(target: "skybook::search", from = %filter.from, to = %filter.to, "input rejected by gate");
            return false;
        }

        self.shared.update(|state| {
            if state.is_closed() {
                return false;
            }
            let seq = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
            if self.inputs.send(Input { filter, seq }).is_err() {
                return false;
            }
            let search = state.search_mut();
            search.pending = true;
            if !search.loading {
                search.phase = SearchPhase::Debouncing;
            }
            true
        })
    }

    /// One-shot, non-debounced load
    ///
    /// Skipped unless both origin and destination are set. Shares the stream
    /// generation, so it supersedes and is superseded like a stream request.
    /// A transport failure is recorded and reported as zero hits.
    pub(crate) async fn load_now(&self, filter: FlightFilter) -> StoreResult<usize> {
        load(Arc::clone(&self.shared), Arc::clone(&self.transport), filter).await
    }

    /// `load_now` on a background task
    ///
    /// The request is issued before this returns, so `idle` observes it.
    pub(crate) fn load_in_background(&self, filter: FlightFilter) {
        let generation = match prepare_load(&self.shared, &filter) {
            Ok(Some(generation)) => generation,
            _ => return,
        };
        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        self.handle.spawn(async move {
            if let Err(e) = execute(shared, transport, filter, generation).await {
                debug!(target: "skybook::search", error = %e, "background load not applied");
            }
        });
    }
}

/// Issue a load generation, or `None` if the filter is incomplete
fn prepare_load(shared: &StoreShared, filter: &FlightFilter) -> StoreResult<Option<u64>> {
    if !filter.is_complete() {
        debug!(target: "skybook::search", from = %filter.from, to = %filter.to, "load skipped: incomplete filter");
        return Ok(None);
    }
    shared
        .update(|state| (!state.is_closed()).then(|| issue(state, filter)))
        .map(Some)
        .ok_or(StoreError::Closed)
}

async fn load(
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    filter: FlightFilter,
) -> StoreResult<usize> {
    let Some(generation) = prepare_load(&shared, &filter)? else {
        return Ok(0);
    };
    match execute(shared, transport, filter, generation).await {
        Err(e) if e.is_transport() => Ok(0),
        other => other,
    }
}

/// Back half of the search stream: debouncer and request issuer
struct Driver {
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    inputs: mpsc::UnboundedReceiver<Input>,
    submitted: Arc<AtomicU64>,
    quiet_window: Duration,
    last_accepted: Option<FlightFilter>,
}

impl Driver {
    async fn run(mut self) {
        let shutdown = self.shared.shutdown_token().clone();
        let timer = sleep(self.quiet_window);
        tokio::pin!(timer);
        let mut staged: Option<Input> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                input = self.inputs.recv() => match input {
                    Some(input) => {
                        staged = Some(input);
                        timer.as_mut().reset(Instant::now() + self.quiet_window);
                    }
                    None => break,
                },
                _ = &mut timer, if staged.is_some() => {
                    if let Some(input) = staged.take() {
                        self.emit(input);
                    }
                }
            }
        }
        trace!(target: "skybook::search", "search driver stopped");
    }

    fn emit(&mut self, input: Input) {
        let duplicate = self.last_accepted.as_ref() == Some(&input.filter);
        let submitted = &self.submitted;

        let issued = self.shared.update(|state| {
            if state.is_closed() {
                return None;
            }
            // A newer input may already be queued behind this one
            let latest = submitted.load(Ordering::SeqCst) == input.seq;
            if duplicate {
                if latest {
                    let search = state.search_mut();
                    search.pending = false;
                    if !search.loading {
                        search.phase = if search.last_error.is_some() {
                            SearchPhase::Failed
                        } else {
                            SearchPhase::Idle
                        };
                    }
                }
                return None;
            }
            if latest {
                state.search_mut().pending = false;
            }
            Some(issue(state, &input.filter))
        });

        if duplicate {
            debug!(target: "skybook::search", from = %input.filter.from, to = %input.filter.to, "duplicate input dropped");
            return;
        }
        let Some(generation) = issued else {
            return;
        };

        self.last_accepted = Some(input.filter.clone());
        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            // Outcome is recorded in the search status
            let _ = execute(shared, transport, input.filter, generation).await;
        });
    }
}

/// Start a new generation for `filter`; everything older becomes stale
fn issue(state: &mut StoreState, filter: &FlightFilter) -> u64 {
    let search = state.search_mut();
    search.generation += 1;
    search.loading = true;
    search.phase = SearchPhase::InFlight;
    search.last_query = Some(filter.clone());
    debug!(
        target: "skybook::search",
        generation = search.generation,
        from = %filter.from,
        to = %filter.to,
        urgent = filter.urgent,
        "issuing search"
    );
    search.generation
}

/// Run the `find` call of `generation` and apply its outcome if still current
async fn execute(
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    filter: FlightFilter,
    generation: u64,
) -> StoreResult<usize> {
    let shutdown = shared.shutdown_token().clone();
    let outcome = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Err(StoreError::Closed),
        result = transport.find(&filter.from, &filter.to, filter.urgent) => result,
    };

    shared.update(|state| {
        if state.is_closed() {
            return Err(StoreError::Closed);
        }
        let current = state.search().generation;
        if current != generation {
            debug!(target: "skybook::search", generation, current, "search result superseded");
            return Err(StoreError::Superseded("search"));
        }

        let (hits, result) = match outcome {
            Ok(flights) => {
                let hits = flights.len();
                let delta = state.merge_flights(flights);
                trace!(target: "skybook::search", generation, hits, ?delta, "search result applied");
                (hits, Ok(hits))
            }
            Err(e) => {
                warn!(target: "skybook::search", generation, error = %e, "search failed, applying empty result");
                (0, Err(StoreError::transport("find", e)))
            }
        };

        let search = state.search_mut();
        search.loading = false;
        search.last_hits = hits;
        search.last_error = result.as_ref().err().map(ToString::to_string);
        search.phase = if search.pending {
            SearchPhase::Debouncing
        } else if search.last_error.is_some() {
            SearchPhase::Failed
        } else {
            SearchPhase::Idle
        };
        result
    })
}
