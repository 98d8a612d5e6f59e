//! State shared between the store facade and its background tasks

use crate::state::{Slice, StoreState};
use crate::views::{ViewEngine, ViewKind};
use parking_lot::RwLock;
use skybook_core::FlightFilter;
use smallvec::SmallVec;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Notification of one committed state change
///
/// Sent once per write critical section that changed at least one slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreChange {
    /// Revision of the state after the change
    pub revision: u64,
    /// Slices whose value changed
    pub slices: SmallVec<[Slice; 5]>,
}

impl StoreChange {
    /// Whether `slice` changed
    pub fn touches(&self, slice: Slice) -> bool {
        self.slices.contains(&slice)
    }

    /// Whether the change can affect `view`
    pub fn affects(&self, view: ViewKind) -> bool {
        view.is_affected_by(&self.slices)
    }
}

pub(crate) struct StoreShared {
    state: RwLock<StoreState>,
    views: ViewEngine,
    changes: watch::Sender<StoreChange>,
    shutdown: CancellationToken,
}

impl StoreShared {
    pub(crate) fn new(initial_filter: FlightFilter) -> Self {
        let (changes, _) = watch::channel(StoreChange::default());
        Self {
            state: RwLock::new(StoreState::new(initial_filter)),
            views: ViewEngine::new(),
            changes,
            shutdown: CancellationToken::new(),
        }
    }

    /// Run `f` under the read lock
    pub(crate) fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.read();
        f(&state)
    }

    /// Run `f` under the write lock and notify subscribers if a slice moved
    ///
    /// The notification is published before the lock is released, so a
    /// subscriber never sees a revision older than the state it reads.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.state.write();
        let before = *state.versions();
        let out = f(&mut state);

        let slices = state.versions().changed_since(&before);
        if !slices.is_empty() {
            let revision = state.next_revision();
            trace!(target: "skybook::store", revision, ?slices, "state changed");
            self.changes.send_replace(StoreChange { revision, slices });
        }
        out
    }

    pub(crate) fn views(&self) -> &ViewEngine {
        &self.views
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.read(StoreState::is_closed)
    }

    /// Close the state and cancel background work; returns whether it was open
    pub(crate) fn close(&self) -> bool {
        let closed = self.update(|state| {
            if !state.close() {
                return false;
            }
            let search = state.search_mut();
            search.pending = false;
            search.loading = false;
            state.load_mut().in_flight = false;
            true
        });
        self.shutdown.cancel();
        closed
    }

    /// Wait until nothing is debouncing or in flight, or the store is closed
    pub(crate) async fn idle(&self) {
        let mut changes = self.subscribe();
        loop {
            if self.read(|state| state.is_closed() || state.is_quiescent()) {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }
}
