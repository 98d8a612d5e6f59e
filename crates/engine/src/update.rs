//! Update controller: pessimistic saves
//!
//! A save is sent to the transport right away, but the cache is only written
//! once the remote source acknowledges it, and then with the record the
//! remote source returned rather than the one submitted.
//!
//! Every save draws a sequence number. Per identity, a ticket remembers the
//! newest sequence already applied, so a slow acknowledgment that arrives
//! after a newer one for the same identity is not applied. The cache ends up
//! holding the server value of the newest acknowledged save whatever order the
//! acknowledgments arrive in. Saves of new records (unset identity) are
//! unrelated to each other, since the remote source assigns each its own
//! identity, so their acknowledgments always apply.
//!
//! Lock order: state write lock first, then the ticket entry.

use crate::shared::StoreShared;
use crate::transport::FlightTransport;
use dashmap::DashMap;
use skybook_core::{Flight, FlightId, StoreError, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SaveTicket {
    in_flight: usize,
    latest_applied: u64,
}

pub(crate) struct UpdateController {
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    tickets: DashMap<FlightId, SaveTicket>,
    sequence: AtomicU64,
}

impl UpdateController {
    pub(crate) fn new(shared: Arc<StoreShared>, transport: Arc<dyn FlightTransport>) -> Self {
        Self {
            shared,
            transport,
            tickets: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Save `flight` remotely, then cache the acknowledged record
    pub(crate) async fn save(&self, flight: Flight) -> StoreResult<Flight> {
        let id = flight.id;
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let opened = self.shared.update(|state| {
            if state.is_closed() {
                return false;
            }
            state.saves_mut().pending += 1;
            self.tickets.entry(id).or_default().in_flight += 1;
            true
        });
        if !opened {
            return Err(StoreError::Closed);
        }
        let mut guard = PendingSave {
            controller: self,
            id,
            settled: false,
        };
        debug!(target: "skybook::update", %id, seq, "save issued");

        let shutdown = self.shared.shutdown_token().clone();
        let outcome = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(StoreError::Closed),
            result = self.transport.save(flight) => result,
        };

        guard.settled = true;
        self.shared.update(|state| {
            let applies = self.release(id, outcome.is_ok().then_some(seq));
            let saves = state.saves_mut();
            saves.pending = saves.pending.saturating_sub(1);

            match outcome {
                Ok(saved) => {
                    saves.completed += 1;
                    if state.is_closed() {
                        return Err(StoreError::Closed);
                    }
                    if applies {
                        let delta = state.upsert_flight(saved.clone());
                        debug!(target: "skybook::update", %id, seq, ?delta, "save acknowledged");
                    } else {
                        debug!(target: "skybook::update", %id, seq, "stale acknowledgment not applied");
                    }
                    Ok(saved)
                }
                Err(e) => {
                    warn!(target: "skybook::update", %id, seq, error = %e, "save failed, cache unchanged");
                    let err = StoreError::transport("save", e);
                    saves.failed += 1;
                    saves.last_error = Some(err.to_string());
                    Err(err)
                }
            }
        })
    }

    /// Whether a save for `id` awaits acknowledgment
    pub(crate) fn is_saving(&self, id: FlightId) -> bool {
        self.tickets
            .get(&id)
            .map_or(false, |ticket| ticket.in_flight > 0)
    }

    /// Close one in-flight save of `id`
    ///
    /// With `Some(seq)` the save was acknowledged; returns whether its record
    /// is newer than every record already applied for `id`.
    fn release(&self, id: FlightId, acknowledged: Option<u64>) -> bool {
        let applies = match self.tickets.get_mut(&id) {
            Some(mut ticket) => {
                ticket.in_flight = ticket.in_flight.saturating_sub(1);
                match acknowledged {
                    Some(_) if id.is_unset() => true,
                    Some(seq) if seq > ticket.latest_applied => {
                        ticket.latest_applied = seq;
                        true
                    }
                    _ => false,
                }
            }
            None => acknowledged.is_some(),
        };
        self.tickets.remove_if(&id, |_, ticket| ticket.in_flight == 0);
        applies
    }
}

/// Keeps the bookkeeping balanced when a save future is dropped mid-flight
struct PendingSave<'a> {
    controller: &'a UpdateController,
    id: FlightId,
    settled: bool,
}

impl Drop for PendingSave<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let controller = self.controller;
        controller.shared.update(|state| {
            controller.release(self.id, None);
            let saves = state.saves_mut();
            saves.pending = saves.pending.saturating_sub(1);
        });
    }
}
