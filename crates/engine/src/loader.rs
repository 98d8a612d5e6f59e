//! Active record hydration
//!
//! Moving the active-identity pointer to a non-zero identity fetches that
//! record through `find_by_id` and upserts it. Each pointer change starts a
//! new lookup generation; a lookup that resolves after the pointer moved on
//! is discarded.

use crate::shared::StoreShared;
use crate::transport::FlightTransport;
use skybook_core::FlightId;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

pub(crate) struct ActiveLoader {
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    handle: Handle,
}

impl ActiveLoader {
    pub(crate) fn new(
        shared: Arc<StoreShared>,
        transport: Arc<dyn FlightTransport>,
        handle: &Handle,
    ) -> Self {
        Self {
            shared,
            transport,
            handle: handle.clone(),
        }
    }

    /// Move the pointer; returns whether it changed
    pub(crate) fn select(&self, id: Option<FlightId>) -> bool {
        let (changed, lookup) = self.shared.update(|state| {
            if state.is_closed() || !state.set_active_id(id) {
                return (false, None);
            }
            let load = state.load_mut();
            load.generation += 1;
            match id {
                Some(id) if !id.is_unset() => {
                    load.in_flight = true;
                    (true, Some((id, load.generation)))
                }
                _ => {
                    load.in_flight = false;
                    (true, None)
                }
            }
        });

        if let Some((id, generation)) = lookup {
            debug!(target: "skybook::load", %id, generation, "hydrating active flight");
            self.handle.spawn(hydrate(
                Arc::clone(&self.shared),
                Arc::clone(&self.transport),
                id,
                generation,
            ));
        }
        changed
    }
}

async fn hydrate(
    shared: Arc<StoreShared>,
    transport: Arc<dyn FlightTransport>,
    id: FlightId,
    generation: u64,
) {
    let shutdown = shared.shutdown_token().clone();
    let outcome = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return,
        result = transport.find_by_id(id) => result,
    };

    shared.update(|state| {
        let current = state.load().generation;
        if state.is_closed() || current != generation {
            debug!(target: "skybook::load", %id, generation, current, "lookup superseded");
            return;
        }
        match outcome {
            Ok(flight) => {
                state.upsert_flight(flight);
                let load = state.load_mut();
                load.in_flight = false;
                load.last_error = None;
            }
            Err(e) => {
                warn!(target: "skybook::load", %id, error = %e, "lookup failed");
                let load = state.load_mut();
                load.in_flight = false;
                load.last_error = Some(e.to_string());
            }
        }
    });
}
